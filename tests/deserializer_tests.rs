use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use ucl_codec::{
    DecoderOptions, KEY_ORDER, Map, SerdeError, UclError, Value, decode_str, from_reader,
    from_reader_with_options, from_str, from_value, to_string,
};

#[derive(Debug, Deserialize, PartialEq)]
struct Upstream {
    host: String,
    port: u16,
    #[serde(default)]
    backup: bool,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
enum Balance {
    RoundRobin,
    Hash { key: String },
}

#[derive(Debug, Deserialize, PartialEq)]
struct Proxy {
    name: String,
    workers: u32,
    timeout: f64,
    offset: i64,
    balance: Balance,
    upstream: Vec<Upstream>,
    headers: HashMap<String, String>,
    listen: (u16, u16),
    motd: Option<String>,
}

const PROXY: &str = r#"
name = "front proxy";
workers 4;
timeout 2.5;
offset -30;
balance { hash { key "$remote_addr"; } }
upstream {
    host "10.0.0.1";
    port 8080;
}
upstream {
    host "10.0.0.2";
    port 8081;
    backup on;
}
headers {
    "X-Forwarded-For" "$proxy";
    Server hidden;
}
listen [80, 443];
motd <<EOT
Welcome.
Be nice.
EOT
"#;

#[cfg(test)]
mod deserializer_tests {
    use super::*;

    #[test]
    fn test_proxy_document() {
        let proxy: Proxy = from_str(PROXY).unwrap();
        assert_eq!(proxy.name, "front proxy");
        assert_eq!(proxy.workers, 4);
        assert_eq!(proxy.timeout, 2.5);
        assert_eq!(proxy.offset, -30);
        assert_eq!(
            proxy.balance,
            Balance::Hash {
                key: "$remote_addr".to_string()
            }
        );
        assert_eq!(
            proxy.upstream,
            vec![
                Upstream {
                    host: "10.0.0.1".to_string(),
                    port: 8080,
                    backup: false,
                },
                Upstream {
                    host: "10.0.0.2".to_string(),
                    port: 8081,
                    backup: true,
                },
            ]
        );
        assert_eq!(proxy.headers["X-Forwarded-For"], "$proxy");
        assert_eq!(proxy.headers["Server"], "hidden");
        assert_eq!(proxy.listen, (80, 443));
        assert_eq!(proxy.motd.as_deref(), Some("Welcome.\nBe nice."));
    }

    #[test]
    fn test_unit_enum_variant() {
        #[derive(Deserialize)]
        struct Only {
            balance: Balance,
        }
        let only: Only = from_str("balance roundrobin;").unwrap();
        assert_eq!(only.balance, Balance::RoundRobin);
    }

    #[test]
    fn test_out_of_range_number() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Port {
            port: u16,
        }
        let err = from_str::<Port>("port 99999;").unwrap_err();
        match err {
            UclError::Serde(SerdeError::TypeMismatch { expected, found }) => {
                assert_eq!(expected, "u16");
                assert!(found.contains("99999"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_field_is_custom_error() {
        let err = from_str::<Upstream>("host a;").unwrap_err();
        assert!(matches!(err, UclError::Serde(SerdeError::Custom(_))));
        assert!(err.to_string().contains("port"));
    }

    #[test]
    fn test_syntax_error_surfaces_from_reader() {
        let err = from_reader::<Upstream, _>("host {".as_bytes()).unwrap_err();
        assert!(err.is_unexpected_eof());
    }

    #[test]
    fn test_from_reader_with_options() {
        let options = DecoderOptions::new().with_key_order(false).with_trace(false);
        let upstream: Upstream =
            from_reader_with_options("host h; port 1;".as_bytes(), options).unwrap();
        assert_eq!(upstream.port, 1);
    }

    #[test]
    fn test_from_value_subtree() {
        let doc = decode_str(PROXY).unwrap();
        let first: Upstream = from_value(doc["upstream"][0].clone()).unwrap();
        assert_eq!(first.host, "10.0.0.1");
        let all: Vec<Upstream> = from_value(doc["upstream"].clone()).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let upstream: Upstream = from_str("host h; port 2; weight 5; extra { a b; }").unwrap();
        assert_eq!(upstream.port, 2);
    }

    #[test]
    fn test_document_to_json() {
        let doc = decode_str("b 1; a { x y; } n;").unwrap();
        let exported = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            exported,
            json!({
                KEY_ORDER: ["b", "a", "n"],
                "b": "1",
                "a": { KEY_ORDER: ["x"], "x": "y" },
                "n": null,
            })
        );
    }

    #[test]
    fn test_document_from_json_keeps_order() {
        let imported: Map = serde_json::from_value(json!({
            KEY_ORDER: ["zeta", "alpha"],
            "alpha": 1,
            "zeta": [true, "x"],
        }))
        .unwrap();
        assert_eq!(imported.key_order().unwrap(), &["zeta", "alpha"]);
        assert_eq!(imported["alpha"].as_str(), Some("1"));
        assert_eq!(imported["zeta"][0].as_bool(), Some(true));
        assert_eq!(to_string(&imported).unwrap(), "zeta [\n   true,\n   x\n];\nalpha 1;\n");
    }

    #[test]
    fn test_json_round_trip_is_equal() {
        let doc = decode_str(PROXY).unwrap();
        let json = serde_json::to_string(&doc).unwrap();
        let back: Map = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_generic_value_extraction() {
        let value: Value = from_str("a [1, 2]; b;").unwrap();
        assert_eq!(value["a"][1].as_u64(), Some(2));
        assert!(value["b"].is_null());
    }
}
