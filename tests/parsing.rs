//! Whole-document tests for the BML parser: the supported value shapes,
//! the folding policies, numbers in every radix, and the error catalogue.

use pretty_assertions::assert_eq;

use libbml::{parse, Map, Parser, StringInput, Value};

fn map(entries: Vec<(Value, Value)>) -> Value {
    Value::Map(entries.into_iter().collect::<Map>())
}

fn err_description(input: &str) -> String {
    parse(input).unwrap_err().description
}

// ----------------------------------------------------------------------
// Scalars
// ----------------------------------------------------------------------

#[test]
fn parses_integer_scalar() {
    assert_eq!(parse("42\n").unwrap(), Value::Int(42));
}

#[test]
fn parses_keywords() {
    assert_eq!(parse("null").unwrap(), Value::Null);
    assert_eq!(parse("true").unwrap(), Value::Bool(true));
    assert_eq!(parse("false").unwrap(), Value::Bool(false));
}

#[test]
fn keyword_prefix_is_a_string() {
    assert_eq!(parse("nullx").unwrap(), Value::from("nullx"));
    assert_eq!(parse("falsey").unwrap(), Value::from("falsey"));
}

#[test]
fn parses_signed_numbers() {
    assert_eq!(parse("-17").unwrap(), Value::Int(-17));
    assert_eq!(parse("+17").unwrap(), Value::Int(17));
}

#[test]
fn parses_radix_prefixes() {
    assert_eq!(parse("0b101010").unwrap(), Value::Int(42));
    assert_eq!(parse("0o52").unwrap(), Value::Int(42));
    assert_eq!(parse("0x2a").unwrap(), Value::Int(42));
    assert_eq!(parse("0X2A").unwrap(), Value::Int(42));
    assert_eq!(parse("0").unwrap(), Value::Int(0));
}

#[test]
fn parses_digit_separators() {
    assert_eq!(parse("1_000_000").unwrap(), Value::Int(1_000_000));
    assert_eq!(parse("1'000'000").unwrap(), Value::Int(1_000_000));
    assert_eq!(parse("0xdead_beef").unwrap(), Value::Int(0xdead_beef));
}

#[test]
fn parses_floats() {
    assert_eq!(parse("3.25").unwrap(), Value::Float(3.25));
    assert_eq!(parse("-2.5e3").unwrap(), Value::Float(-2500.0));
    assert_eq!(parse("1e3").unwrap(), Value::Float(1000.0));
    assert_eq!(parse("2.5E2").unwrap(), Value::Float(250.0));
}

#[test]
fn large_magnitude_becomes_unsigned() {
    assert_eq!(parse("9223372036854775807").unwrap(), Value::Int(i64::MAX));
    assert_eq!(
        parse("9223372036854775808").unwrap(),
        Value::UInt(9223372036854775808)
    );
    assert_eq!(parse("18446744073709551615").unwrap(), Value::UInt(u64::MAX));
}

#[test]
fn number_errors() {
    assert_eq!(err_description("18446744073709551616"), "Numeric overflow");
    assert_eq!(err_description("-9223372036854775808"), "Integer overflow");
    assert_eq!(err_description("1e999"), "Floating point overflow");
    assert_eq!(err_description("12ab"), "Bad number");
    assert_eq!(err_description("0x"), "Bad number");
    assert_eq!(err_description("1''2"), "Duplicate separator in the number");
    assert_eq!(
        err_description("0x1.5"),
        "Only decimal representation is supported for floating point numbers"
    );
}

#[test]
fn non_numbers_fall_back_to_strings() {
    // a separator cannot start a number, so these are literal strings
    assert_eq!(parse("_1").unwrap(), Value::from("_1"));
    assert_eq!(parse("-x").unwrap(), Value::from("-x"));
}

// ----------------------------------------------------------------------
// Quoted strings
// ----------------------------------------------------------------------

#[test]
fn parses_single_line_quoted_string() {
    assert_eq!(parse("\"x\"").unwrap(), Value::from("x"));
    assert_eq!(parse("\"a b  c\"").unwrap(), Value::from("a b  c"));
    assert_eq!(parse("\"\"").unwrap(), Value::from(""));
}

#[test]
fn decodes_escapes_in_quoted_strings() {
    assert_eq!(parse(r#""a\tb\n""#).unwrap(), Value::from("a\tb\n"));
    assert_eq!(parse(r#""\x41\u0416""#).unwrap(), Value::from("AЖ"));
    assert_eq!(parse(r#""say \"hi\"""#).unwrap(), Value::from("say \"hi\""));
}

#[test]
fn folds_multi_line_quoted_string() {
    assert_eq!(parse("\"a\n b\n c\"").unwrap(), Value::from("a b c"));
}

#[test]
fn multi_line_quoted_string_drops_empty_lines() {
    assert_eq!(parse("\"a\n\n b\"").unwrap(), Value::from("a b"));
}

#[test]
fn closing_quote_may_sit_at_opening_column() {
    assert_eq!(parse("\"a\n b\n\"").unwrap(), Value::from("a b"));
}

#[test]
fn string_errors() {
    assert_eq!(
        err_description("\"a\n b"),
        "String contains no closing quote"
    );
    assert_eq!(
        err_description("\"a\n b\" x"),
        "Bad character after quoted string"
    );
    assert_eq!(err_description(r#""\x4z""#), "Bad hexadecimal value");
    assert_eq!(err_description(r#""\o""#), "Incomplete octal value");
}

#[test]
fn comment_after_quoted_string_is_ignored() {
    assert_eq!(parse("\"x\" # note").unwrap(), Value::from("x"));
}

// ----------------------------------------------------------------------
// Literal, folded, raw
// ----------------------------------------------------------------------

#[test]
fn parses_literal_block_inline() {
    let input = ":literal:  abc\n           def\n";
    assert_eq!(parse(input).unwrap(), Value::from("abc\ndef\n"));
}

#[test]
fn parses_literal_block_from_next_line() {
    let input = ":literal:\n    abc\n    def\n";
    assert_eq!(parse(input).unwrap(), Value::from("abc\ndef\n"));
}

#[test]
fn single_line_literal_has_no_trailing_newline() {
    assert_eq!(parse(":literal: abc\n").unwrap(), Value::from("abc"));
}

#[test]
fn literal_preserves_interior_blank_lines() {
    let input = "text::literal:\n        a\n\n        b\n";
    let value = parse(input).unwrap();
    let map = value.as_map().unwrap();
    assert_eq!(
        map.get(&Value::from("text")),
        Some(&Value::from("a\n\nb\n"))
    );
}

#[test]
fn literal_drops_trailing_blank_lines() {
    let input = ":literal:\n    abc\n\n\n";
    assert_eq!(parse(input).unwrap(), Value::from("abc"));
}

#[test]
fn folded_joins_lines_with_spaces() {
    let input = ":folded:\n    a\n    b\n\n    c\n";
    assert_eq!(parse(input).unwrap(), Value::from("a b c"));
}

#[test]
fn raw_preserves_indent_and_comments() {
    let input = ":raw:\n  a\n    b\n  # not a comment\n";
    assert_eq!(
        parse(input).unwrap(),
        Value::from(" a\n   b\n # not a comment\n")
    );
}

#[test]
fn unknown_specifier_is_a_literal_string() {
    assert_eq!(parse(":nope: x\n").unwrap(), Value::from(":nope: x"));
}

#[test]
fn colon_line_without_specifier_is_a_literal_string() {
    assert_eq!(parse(":: nothing\n").unwrap(), Value::from(":: nothing"));
}

#[test]
fn stub_specifiers_report_not_implemented() {
    assert_eq!(
        err_description(":isodate: 2026-08-02"),
        "isodate values are not implemented"
    );
    assert_eq!(
        err_description(":json: {}"),
        "JSON blocks are not implemented"
    );
}

// ----------------------------------------------------------------------
// Lists
// ----------------------------------------------------------------------

#[test]
fn parses_list_of_mixed_scalars() {
    let input = "- 1\n- true\n- \"x\"\n";
    assert_eq!(
        parse(input).unwrap(),
        Value::List(vec![Value::Int(1), Value::Bool(true), Value::from("x")])
    );
}

#[test]
fn parses_list_item_on_next_line() {
    let input = "-\n    a: 1\n- 2\n";
    assert_eq!(
        parse(input).unwrap(),
        Value::List(vec![
            map(vec![(Value::from("a"), Value::Int(1))]),
            Value::Int(2),
        ])
    );
}

#[test]
fn parses_nested_lists() {
    let input = "- - 1\n  - 2\n- 3\n";
    assert_eq!(
        parse(input).unwrap(),
        Value::List(vec![
            Value::List(vec![Value::Int(1), Value::Int(2)]),
            Value::Int(3),
        ])
    );
}

#[test]
fn list_items_must_share_indent() {
    assert_eq!(
        err_description("- 1\n - 2\n"),
        "Bad indentation of list item"
    );
}

#[test]
fn list_item_needs_space_after_hyphen() {
    assert_eq!(err_description("- 1\n-x\n"), "Bad list item");
}

#[test]
fn negative_number_is_not_a_list() {
    assert_eq!(parse("-1").unwrap(), Value::Int(-1));
}

// ----------------------------------------------------------------------
// Maps
// ----------------------------------------------------------------------

#[test]
fn parses_map_with_leading_comment() {
    let input = "# greeting\ngreeting: Hello\ncount: 3\n";
    assert_eq!(
        parse(input).unwrap(),
        map(vec![
            (Value::from("greeting"), Value::from("Hello")),
            (Value::from("count"), Value::Int(3)),
        ])
    );
}

#[test]
fn parses_nested_maps() {
    let input = "root:\n    a: 1\n    b:\n        c: 2\n";
    assert_eq!(
        parse(input).unwrap(),
        map(vec![(
            Value::from("root"),
            map(vec![
                (Value::from("a"), Value::Int(1)),
                (
                    Value::from("b"),
                    map(vec![(Value::from("c"), Value::Int(2))])
                ),
            ])
        )])
    );
}

#[test]
fn map_preserves_insertion_order() {
    let input = "b: 1\na: 2\nc: 3\n";
    let value = parse(input).unwrap();
    let keys: Vec<String> = value
        .as_map()
        .unwrap()
        .iter()
        .map(|(k, _)| k.as_str().unwrap().to_string())
        .collect();
    assert_eq!(keys, vec!["b", "a", "c"]);
}

#[test]
fn duplicate_map_key_keeps_last_value() {
    let input = "k: 1\nk: 2\n";
    assert_eq!(
        parse(input).unwrap(),
        map(vec![(Value::from("k"), Value::Int(2))])
    );
}

#[test]
fn scalar_map_keys() {
    let input = "1: a\ntrue: b\nnull: c\n-2: d\n";
    assert_eq!(
        parse(input).unwrap(),
        map(vec![
            (Value::Int(1), Value::from("a")),
            (Value::Bool(true), Value::from("b")),
            (Value::Null, Value::from("c")),
            (Value::Int(-2), Value::from("d")),
        ])
    );
}

#[test]
fn quoted_map_key() {
    let input = "\"a key\": 1\n";
    assert_eq!(
        parse(input).unwrap(),
        map(vec![(Value::from("a key"), Value::Int(1))])
    );
}

#[test]
fn map_value_may_be_a_list_block() {
    let input = "items:\n    - 1\n    - 2\n";
    assert_eq!(
        parse(input).unwrap(),
        map(vec![(
            Value::from("items"),
            Value::List(vec![Value::Int(1), Value::Int(2)])
        )])
    );
}

#[test]
fn map_inside_list_item() {
    let input = "- a: 1\n  b: 2\n";
    assert_eq!(
        parse(input).unwrap(),
        Value::List(vec![map(vec![
            (Value::from("a"), Value::Int(1)),
            (Value::from("b"), Value::Int(2)),
        ])])
    );
}

#[test]
fn map_keys_must_share_indent() {
    assert_eq!(
        err_description("a: 1\n  b: 2\n"),
        "Bad indentation of map key"
    );
}

#[test]
fn map_key_cannot_start_with_colon() {
    let input = "a: 1\n:literal: x\n";
    assert_eq!(
        err_description(input),
        "Map key expected and it cannot start with colon"
    );
}

#[test]
fn map_key_cannot_be_a_list() {
    let input = "a: 1\n- 2\n";
    assert_eq!(
        err_description(input),
        "Map key expected and it cannot be a list"
    );
}

#[test]
fn line_without_separator_inside_map_is_an_error() {
    assert_eq!(err_description("a: 1\nb\n"), "Map key expected");
}

#[test]
fn empty_map_value_is_an_error() {
    assert_eq!(err_description("a:\n"), "Empty block");
}

#[test]
fn map_value_with_conversion_specifier() {
    let input = "text: :folded:\n        a\n        b\n";
    assert_eq!(
        parse(input).unwrap(),
        map(vec![(Value::from("text"), Value::from("a b"))])
    );
}

#[test]
fn specifier_right_after_key_colon_is_a_separator() {
    let input = "text::folded:\n        a\n        b\n";
    assert_eq!(
        parse(input).unwrap(),
        map(vec![(Value::from("text"), Value::from("a b"))])
    );
}

// ----------------------------------------------------------------------
// Comments, blank lines, trailing data
// ----------------------------------------------------------------------

#[test]
fn comments_between_blocks_are_invisible() {
    let plain = "a: 1\nb: 2\n";
    let commented = "# head\na: 1\n# between\nb: 2\n# tail\n";
    assert_eq!(parse(plain).unwrap(), parse(commented).unwrap());
}

#[test]
fn dedented_comments_inside_blocks_are_skipped() {
    let input = "root:\n    a: 1\n# dedented comment\n    b: 2\n";
    assert_eq!(
        parse(input).unwrap(),
        map(vec![(
            Value::from("root"),
            map(vec![
                (Value::from("a"), Value::Int(1)),
                (Value::from("b"), Value::Int(2)),
            ])
        )])
    );
}

#[test]
fn inline_comment_after_scalar() {
    assert_eq!(parse("42 # the answer\n").unwrap(), Value::Int(42));
}

#[test]
fn trailing_whitespace_is_ignored() {
    assert_eq!(parse("42   \n").unwrap(), Value::Int(42));
    assert_eq!(
        parse("a: 1  \nb: 2\t\n").unwrap(),
        parse("a: 1\nb: 2\n").unwrap()
    );
}

#[test]
fn empty_input_is_an_error() {
    assert_eq!(err_description(""), "Unexpected end of file");
    assert_eq!(err_description("# only comments\n\n"), "Unexpected end of file");
}

#[test]
fn extra_data_after_value_is_an_error() {
    assert_eq!(err_description("42\nmore\n"), "Extra data after parsed value");
}

#[test]
fn trailing_comments_are_not_extra_data() {
    assert_eq!(parse("42\n# done\n# really\n").unwrap(), Value::Int(42));
}

#[test]
fn bad_character_after_scalar() {
    let err = parse("42 xyz\n").unwrap_err();
    assert_eq!(err.description, "Bad character encountered");
    assert_eq!(err.line_number, 1);
    assert_eq!(err.position, 3);
}

// ----------------------------------------------------------------------
// Nesting depth and custom parsers
// ----------------------------------------------------------------------

#[test]
fn deep_nesting_is_rejected() {
    let mut input = String::new();
    for level in 0..120 {
        input.push_str(&" ".repeat(4 * level));
        input.push_str("k:\n");
    }
    input.push_str(&" ".repeat(4 * 120));
    input.push_str("1\n");
    assert_eq!(err_description(&input), "Too many nested blocks");
}

#[test]
fn nesting_cap_is_adjustable() {
    let input = "a:\n  b:\n    c: 1\n";
    let parser = Parser::new(StringInput::new(input)).max_block_level(2);
    assert_eq!(
        parser.parse().unwrap_err().description,
        "Too many nested blocks"
    );
    assert!(parse(input).is_ok());
}

#[test]
fn custom_parser_receives_the_block() {
    let mut parser = Parser::new(StringInput::new(":shout:\n    hello\n    world\n"));
    parser.set_custom_parser("shout", |p| {
        let lines = p.read_block()?;
        let words: Vec<String> = lines.iter().map(|l| l.trim().to_uppercase()).collect();
        Ok(Value::String(words.join(" ")))
    });
    assert_eq!(parser.parse().unwrap(), Value::from("HELLO WORLD"));
}

#[test]
fn custom_parser_overrides_builtin() {
    let mut parser = Parser::new(StringInput::new(":json: ignored\n"));
    parser.set_custom_parser("json", |p| {
        p.read_block()?;
        Ok(Value::Null)
    });
    assert_eq!(parser.parse().unwrap(), Value::Null);
}

#[test]
fn error_positions_are_reported() {
    let err = parse("a: 1\n  b: 2\n").unwrap_err();
    assert_eq!(err.line_number, 2);
    assert_eq!(err.position, 2);
}
