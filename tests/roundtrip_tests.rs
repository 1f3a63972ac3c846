use ucl_codec::{EncoderOptions, Map, UclError, Value, decode_str, to_string_with_options};

const SECTION_DOCUMENT: &str = r#"
section {
    foo = bar;

    abc zyx;
	quoted "quoted";
	internalquoted "internally\"quoted with 'single quote'";
	quotedmulti "quote
edmulti";
    foo = z;
	t {
        child_of a t;
    }
	foo {
		another one {
			two 3;
			three 4;
		}
		another three {
			is 5;
		}

		multi field "value";
	}

    list [
		{ a: 123 } ];
    multilist [ "1",
	"2",
	3
	];

      # a hash comment
      /* A comment that's */

      x /some_regex/;

      zz "ABC CDE";

      mlstring = <<EODX
This is something
of

a
long
string  .
.
EODX;
	none; # this is a null value
	emptystr "";
	single-quote 'Single"Quote';
	"Quoted\"key" 'som\'evalue';
	mustquote "adsfasf:asdfsa";
}
"#;

#[cfg(test)]
mod roundtrip_tests {
    use super::*;

    fn encode(doc: &Map, indent: &str) -> String {
        to_string_with_options(doc, &EncoderOptions::default().with_indent(indent)).unwrap()
    }

    fn texts(value: &Value) -> Vec<&str> {
        value
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect()
    }

    #[test]
    fn test_section_document_decodes() -> Result<(), UclError> {
        let doc = decode_str(SECTION_DOCUMENT)?;
        let section = &doc["section"];

        let foo = section["foo"].as_array().unwrap();
        assert_eq!(foo.len(), 3);
        assert_eq!(foo[0].as_str(), Some("bar"));
        assert_eq!(foo[1].as_str(), Some("z"));
        assert_eq!(foo[2]["multi"]["field"].as_str(), Some("value"));

        let another = foo[2]["another"].as_array().unwrap();
        assert_eq!(another[0]["one"]["two"].as_str(), Some("3"));
        assert_eq!(another[0]["one"]["three"].as_str(), Some("4"));
        assert_eq!(another[1]["three"]["is"].as_str(), Some("5"));

        assert_eq!(section["abc"].as_str(), Some("zyx"));
        assert_eq!(section["quoted"].as_str(), Some("quoted"));
        assert_eq!(
            section["internalquoted"].as_str(),
            Some("internally\"quoted with 'single quote'")
        );
        assert_eq!(section["quotedmulti"].as_str(), Some("quote\nedmulti"));
        assert_eq!(section["t"]["child_of"]["a"].as_str(), Some("t"));
        assert_eq!(section["list"][0]["a"].as_str(), Some("123"));
        assert_eq!(texts(&section["multilist"]), vec!["1", "2", "3"]);
        assert_eq!(section["x"].as_str(), Some("/some_regex/"));
        assert_eq!(section["zz"].as_str(), Some("ABC CDE"));
        assert_eq!(
            section["mlstring"].as_str(),
            Some("This is something\nof\n\na\nlong\nstring  .\n.")
        );
        assert!(section["none"].is_null());
        assert!(section.as_map().unwrap().contains_key("none"));
        assert_eq!(section["emptystr"].as_str(), Some(""));
        assert_eq!(section["single-quote"].as_str(), Some("Single\"Quote"));
        assert_eq!(section["Quoted\"key"].as_str(), Some("som'evalue"));
        assert_eq!(section["mustquote"].as_str(), Some("adsfasf:asdfsa"));
        Ok(())
    }

    #[test]
    fn test_section_document_key_order() {
        let doc = decode_str(SECTION_DOCUMENT).unwrap();
        let order = doc["section"].as_map().unwrap().key_order().unwrap();
        assert_eq!(
            order,
            &[
                "foo",
                "abc",
                "quoted",
                "internalquoted",
                "quotedmulti",
                "t",
                "list",
                "multilist",
                "x",
                "zz",
                "mlstring",
                "none",
                "emptystr",
                "single-quote",
                "Quoted\"key",
                "mustquote",
            ]
        );
    }

    #[test]
    fn test_encoding_is_byte_stable() {
        let doc = decode_str(SECTION_DOCUMENT).unwrap();
        let first = encode(&doc, "   ");
        let reparsed = decode_str(&first).unwrap();
        let second = encode(&reparsed, "   ");
        assert_eq!(first, second);
    }

    #[test]
    fn test_decode_encode_decode_is_equal() {
        let doc = decode_str(SECTION_DOCUMENT).unwrap();
        for indent in ["   ", "\t", ""] {
            let text = encode(&doc, indent);
            let reparsed = decode_str(&text).unwrap();
            assert_eq!(reparsed, doc, "indent {:?} produced:\n{}", indent, text);
        }
    }

    #[test]
    fn test_encoded_quoting() {
        let doc = decode_str(SECTION_DOCUMENT).unwrap();
        let text = encode(&doc, "   ");
        assert!(text.contains("mustquote \"adsfasf:asdfsa\";"));
        assert!(text.contains("abc zyx;"));
        assert!(text.contains("x /some_regex/;"));
        assert!(text.contains("emptystr \"\";"));
        assert!(text.contains("none;"));
        assert!(!text.contains(ucl_codec::KEY_ORDER));
    }

    #[test]
    fn test_long_text_round_trips_through_heredoc() {
        let line = "a fairly long line of configuration text";
        let body = [line; 5].join("\n");
        let mut doc = Map::with_key_order();
        doc.append("text".to_string(), Value::from(body.as_str()));

        let encoded = encode(&doc, "   ");
        assert!(encoded.starts_with("text <<EOSTR\n"));
        assert_eq!(decode_str(&encoded).unwrap(), doc);
    }

    #[test]
    fn test_nested_arrays_round_trip() {
        let doc = decode_str("m [ [a, b], [], [ { k v } ] ];").unwrap();
        let text = encode(&doc, "  ");
        assert_eq!(decode_str(&text).unwrap(), doc);
    }

    #[test]
    fn test_escaped_text_round_trips() {
        let mut doc = Map::with_key_order();
        doc.append(
            "weird key".to_string(),
            Value::from("tab\tbell\u{7}quote\"back\\slash\u{1}"),
        );
        doc.append("".to_string(), Value::from("/not a regex"));
        let text = encode(&doc, "   ");
        assert_eq!(decode_str(&text).unwrap(), doc);
    }
}
