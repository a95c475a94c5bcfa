// Structural properties of the block parser over whole request files

use reqfile_ls::config::BlockNameSettings;
use reqfile_ls::parser::{
    ArrayItem, BlockContent, BlockKind, ConfiguredBlockNames, DictionaryItem, ParsedDocument,
    parse,
};
use reqfile_ls::text::{LineDocument, Position, Range};
use rstest::rstest;

const GET_USER: &str = r#"meta {
  name: Get user
  type: http
  seq: 1
}

get {
  url: {{baseUrl}}/users/{{id}}
  body: json
  auth: none
}

headers {
  accept: application/json
  ~x-debug: 1
}

body:json {
  {
    "name": "Ada",
    "tags": ["a", "}"]
  }
}

vars:pre-request {
  ids: [
    one,
    two
  ]
}

script:pre-request {
  const token = bru.getEnvVar("token");
  req.setHeader("authorization", `Bearer ${token}`);
}

tests {
  test("status", function () {
    expect(res.status).to.equal(200);
  });
}

docs {
  Fetches { one } user.
}
"#;

fn names() -> ConfiguredBlockNames {
    ConfiguredBlockNames::from_settings(&BlockNameSettings::default())
}

fn parse_ok(text: &str) -> ParsedDocument {
    parse(text, &names()).expect("parse should succeed")
}

/// Lines strictly between `open` and `close`, breaks kept, minus the break
/// that ends the last of them.
fn lines_between(text: &str, open: usize, close: usize) -> String {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    let joined = lines[open + 1..close].concat();
    joined
        .strip_suffix("\r\n")
        .or_else(|| joined.strip_suffix('\n'))
        .unwrap_or(&joined)
        .to_string()
}

#[rstest]
#[case::lf(GET_USER.to_string())]
#[case::crlf(GET_USER.replace('\n', "\r\n"))]
fn content_range_round_trips_between_bracket_lines(#[case] text: String) {
    let document = LineDocument::new(text.as_str());
    let parsed = parse_ok(&text);
    assert_eq!(parsed.blocks.len(), 8);

    for block in &parsed.blocks {
        let open = block.range.start().line as usize;
        let close = block.range.end().line as usize;
        assert_eq!(
            document.get_text(block.content_range),
            lines_between(&text, open, close),
            "block {}",
            block.name
        );
    }
}

#[rstest]
#[case::well_formed(GET_USER)]
#[case::leading_comment("# comment\nmeta {\n  name: a\n}\ntrailing text")]
#[case::unterminated("meta {\n  name: a\n}\n\nheaders {\n  a: b\n")]
#[case::empty("")]
fn blocks_and_outside_text_tile_the_document(#[case] text: &str) {
    let document = LineDocument::new(text);
    let parsed = parse_ok(text);

    let mut ranges: Vec<Range> = parsed
        .blocks
        .iter()
        .map(|block| block.range)
        .chain(parsed.text_outside_of_blocks.iter().map(|outside| outside.range))
        .collect();
    ranges.sort_by_key(|range| range.start());

    for pair in ranges.windows(2) {
        assert!(!pair[0].overlaps(&pair[1]), "{:?} overlaps {:?}", pair[0], pair[1]);
        assert_eq!(pair[0].end(), pair[1].start());
    }
    let rebuilt: String = ranges.iter().map(|range| document.get_text(*range)).collect();
    assert_eq!(rebuilt, text);
}

#[test]
fn unterminated_block_poisons_the_rest() {
    let text = "meta {\n  name: a\n}\n\nheaders {\n  a: b\n\nbody:json {\n  {}\n}\n";
    let parsed = parse_ok(text);

    assert_eq!(parsed.blocks.len(), 1);
    assert_eq!(parsed.blocks[0].name, "meta");
    let trailing = parsed.text_outside_of_blocks.last().unwrap();
    assert_eq!(trailing.range.start(), Position::new(4, 0));
    assert_eq!(trailing.range.end(), LineDocument::new(text).end_position());
}

#[test]
fn dictionary_fields_point_at_their_text() {
    let text = "headers {\n  a: 1\n  b: two words\n}";
    let document = LineDocument::new(text);
    let parsed = parse_ok(text);

    let fields: Vec<_> = parsed.blocks[0].fields().collect();
    assert_eq!(fields.len(), 2);
    assert_eq!((fields[0].key.as_str(), fields[0].value.as_str()), ("a", "1"));
    assert_eq!((fields[1].key.as_str(), fields[1].value.as_str()), ("b", "two words"));
    assert_eq!(document.get_text(fields[1].key_range), "b");
    assert_eq!(document.get_text(fields[1].value_range), "two words");
}

#[test]
fn array_line_without_comma_is_demoted() {
    let text = "tags [\n  foo,\n  bar\n  baz\n]";
    let parsed = parse_ok(text);

    let BlockContent::Array(items) = &parsed.blocks[0].content else {
        panic!("expected array block");
    };
    let entries: Vec<&str> = items
        .iter()
        .filter_map(|item| match item {
            ArrayItem::Entry(entry) => Some(entry.entry.as_str()),
            ArrayItem::PlainText(_) => None,
        })
        .collect();
    assert_eq!(entries, vec!["foo"]);

    let demoted: Vec<&str> = parsed.blocks[0]
        .plain_text_lines()
        .iter()
        .map(|line| line.text.trim())
        .collect();
    assert_eq!(demoted, vec!["bar", "baz"]);
}

#[test]
fn block_kinds_follow_names_and_brackets() {
    let parsed = parse_ok(GET_USER);
    let kinds: Vec<(&str, BlockKind)> = parsed
        .blocks
        .iter()
        .map(|block| (block.name.as_str(), block.kind()))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("meta", BlockKind::Dictionary),
            ("get", BlockKind::Dictionary),
            ("headers", BlockKind::Dictionary),
            ("body:json", BlockKind::Json),
            ("vars:pre-request", BlockKind::Dictionary),
            ("script:pre-request", BlockKind::Code),
            ("tests", BlockKind::Code),
            ("docs", BlockKind::PlainText),
        ]
    );
}

#[test]
fn array_valued_field_inside_dictionary() {
    let parsed = parse_ok(GET_USER);
    let vars = parsed.block("vars:pre-request").unwrap();
    let BlockContent::Dictionary(items) = &vars.content else {
        panic!("expected dictionary");
    };
    match &items[0] {
        DictionaryItem::ArrayField(field) => {
            assert_eq!(field.key, "ids");
            let values: Vec<&str> = field.values.iter().map(|v| v.entry.as_str()).collect();
            assert_eq!(values, vec!["one", "two"]);
        }
        other => panic!("expected array field, got {other:?}"),
    }
}

#[test]
fn reparsing_is_deterministic() {
    assert_eq!(parse_ok(GET_USER), parse_ok(GET_USER));
}
