use serde_json::{Value, json};

fn json_response(description: &str, schema: Value) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": { "schema": schema },
        },
    })
}

fn error_response(description: &str) -> Value {
    json_response(description, json!({ "$ref": "#/components/schemas/Error" }))
}

pub fn openapi_spec() -> Value {
    let ack = json!({ "$ref": "#/components/schemas/Ack" });
    let event_list = json!({
        "type": "array",
        "items": { "$ref": "#/components/schemas/Event" },
    });

    json!({
        "openapi": "3.1.0",
        "info": {
            "title": "Audit Trail API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Bounded visitor event log with summary and statistics reads.",
        },
        "paths": {
            "/healthz": {
                "get": {
                    "summary": "Health check",
                    "responses": { "200": json_response("Service health", json!({ "type": "object" })) },
                },
            },
            "/openapi.json": {
                "get": {
                    "summary": "This document",
                    "responses": { "200": json_response("OpenAPI 3.1 document", json!({ "type": "object" })) },
                },
            },
            "/api/audit": {
                "post": {
                    "summary": "Log event",
                    "description": "Oldest events are evicted silently once capacity is reached.",
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/EventSubmission" },
                            },
                        },
                    },
                    "responses": {
                        "200": json_response("Event stored", ack.clone()),
                        "400": error_response("Body is not a JSON object or lacks an event type"),
                        "405": error_response("An `action` query was supplied"),
                        "503": error_response("Log file could not be written"),
                    },
                },
                "get": {
                    "summary": "API info, or a read selected by `action`",
                    "parameters": [{ "$ref": "#/components/parameters/ActionQuery" }],
                    "responses": {
                        "200": json_response("Info document or the selected read", json!({})),
                        "404": error_response("Unknown action"),
                    },
                },
                "delete": {
                    "summary": "Clear all events when `action=clear`",
                    "parameters": [{ "$ref": "#/components/parameters/ActionQuery" }],
                    "responses": {
                        "200": json_response("Store cleared", ack.clone()),
                        "405": error_response("Missing or unsupported action"),
                    },
                },
            },
            "/api/audit/events": {
                "get": {
                    "summary": "All retained events, newest first",
                    "responses": { "200": json_response("Events", event_list.clone()) },
                },
            },
            "/api/audit/summary": {
                "get": {
                    "summary": "Totals, unique visitors and counts by event type",
                    "responses": {
                        "200": json_response("Summary", json!({ "$ref": "#/components/schemas/Summary" })),
                    },
                },
            },
            "/api/audit/stats": {
                "get": {
                    "summary": "Extended statistics",
                    "responses": {
                        "200": json_response("Statistics", json!({ "$ref": "#/components/schemas/Stats" })),
                    },
                },
            },
            "/api/audit/export": {
                "get": {
                    "summary": "Download the log as a JSON attachment, oldest first",
                    "responses": { "200": json_response("Event log", event_list) },
                },
            },
            "/api/audit/clear": {
                "delete": {
                    "summary": "Clear all events",
                    "responses": {
                        "200": json_response("Store cleared", ack),
                        "503": error_response("Log file could not be written"),
                    },
                },
            },
        },
        "components": {
            "parameters": {
                "ActionQuery": {
                    "name": "action",
                    "in": "query",
                    "required": false,
                    "schema": {
                        "type": "string",
                        "enum": ["events", "summary", "stats", "export", "clear"],
                    },
                },
            },
            "schemas": {
                "EventSubmission": {
                    "type": "object",
                    "description": "Any JSON object. `eventType` (or `type`) is required; other fields are kept verbatim.",
                    "required": ["eventType"],
                    "properties": {
                        "eventType": { "type": "string", "examples": ["page_view", "click", "form_submission"] },
                        "visitorId": { "type": "string" },
                        "sessionId": { "type": "string" },
                        "timestamp": { "type": "string", "format": "date-time" },
                    },
                    "additionalProperties": true,
                },
                "Event": {
                    "allOf": [
                        { "$ref": "#/components/schemas/EventSubmission" },
                        {
                            "type": "object",
                            "required": ["server"],
                            "properties": { "server": { "$ref": "#/components/schemas/ServerMeta" } },
                        },
                    ],
                },
                "ServerMeta": {
                    "type": "object",
                    "required": ["receivedAt", "ipHash"],
                    "properties": {
                        "receivedAt": { "type": "string", "format": "date-time" },
                        "ipHash": { "type": "string", "pattern": "^[0-9a-f]{16}$" },
                        "userAgent": { "type": "string" },
                        "referer": { "type": "string" },
                    },
                },
                "Summary": {
                    "type": "object",
                    "required": ["totalEvents", "uniqueVisitors", "eventsByType"],
                    "properties": {
                        "totalEvents": { "type": "integer" },
                        "uniqueVisitors": { "type": "integer" },
                        "eventsByType": {
                            "type": "object",
                            "additionalProperties": { "type": "integer" },
                        },
                    },
                },
                "Stats": {
                    "type": "object",
                    "properties": {
                        "totalEvents": { "type": "integer" },
                        "pageViews": { "type": "integer" },
                        "clicks": { "type": "integer" },
                        "formSubmissions": { "type": "integer" },
                        "uniqueVisitors": { "type": "integer" },
                        "uniqueSessions": { "type": "integer" },
                        "eventsByType": {
                            "type": "object",
                            "additionalProperties": { "type": "integer" },
                        },
                        "devices": {
                            "type": "object",
                            "properties": {
                                "desktop": { "type": "integer" },
                                "mobile": { "type": "integer" },
                                "tablet": { "type": "integer" },
                                "other": { "type": "integer" },
                            },
                        },
                        "topPages": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "path": { "type": "string" },
                                    "count": { "type": "integer" },
                                },
                            },
                        },
                        "averageTimeOnPage": { "type": "integer", "description": "milliseconds" },
                        "recentEvents": {
                            "type": "array",
                            "items": { "$ref": "#/components/schemas/Event" },
                        },
                        "timeRange": {
                            "type": "object",
                            "properties": {
                                "first": { "type": ["string", "null"], "format": "date-time" },
                                "last": { "type": ["string", "null"], "format": "date-time" },
                            },
                        },
                    },
                },
                "Ack": {
                    "type": "object",
                    "required": ["success", "message"],
                    "properties": {
                        "success": { "type": "boolean" },
                        "message": { "type": "string" },
                        "total": { "type": "integer" },
                    },
                },
                "Error": {
                    "type": "object",
                    "required": ["error"],
                    "properties": { "error": { "type": "string" } },
                },
            },
        },
    })
}
