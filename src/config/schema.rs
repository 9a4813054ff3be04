use serde_json::{json, Value};
use std::sync::LazyLock;

pub static CONFIG_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "database": {
                "type": "object",
                "properties": {
                    "path": { "type": "string", "minLength": 1 }
                }
            },
            "tools": {
                "type": "object",
                "properties": {
                    "nmap": { "type": "string" },
                    "masscan": { "type": "string" },
                    "nuclei": { "type": "string" },
                    "subfinder": { "type": "string" },
                    "ffuf": { "type": "string" },
                    "dig": { "type": "string" },
                    "ffuf_wordlist": { "type": "string" }
                }
            },
            "scans": {
                "type": "object",
                "properties": {
                    "timeouts": {
                        "type": "object",
                        "propertyNames": { "$ref": "#/definitions/scan_type" },
                        "additionalProperties": { "type": "integer", "minimum": 1 }
                    },
                    "defaults": {
                        "type": "object",
                        "propertyNames": { "$ref": "#/definitions/scan_type" },
                        "additionalProperties": { "type": "object" }
                    }
                }
            }
        },
        "definitions": {
            "scan_type": {
                "type": "string",
                "enum": [
                    "quick", "service", "masscan", "dns", "subdomain",
                    "vuln", "web_fuzz", "full_recon", "full_web"
                ]
            }
        }
    })
});
