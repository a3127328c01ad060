use crate::prelude::*;

/// Records what each line could see in the block cache
#[derive(Debug, Default)]
struct Trace {
    /// (block line number, visible cache keys)
    visible: Vec<(usize, Vec<String>)>,
    closed: Vec<usize>,
}

fn any(line: &str, _: usize) -> Option<char> {
    line.chars().next()
}

fn three_lines(_: &str, n: usize, _: Option<&str>) -> bool {
    n == 3
}

fn trace(_: &Fields, ctx: &mut Context<Trace>) -> Result<(), ParsingError> {
    let n = ctx.cache.line_num();
    let mut visible: Vec<String> = ctx.cache.keys().map(|k| k.to_string()).collect();
    visible.sort();
    ctx.state.visible.push((n, visible));
    ctx.cache.set(&format!("line{}", n), Value::Integer(n as i64));
    Ok(())
}

fn count(ctx: &mut Context<Trace>) -> Result<(), ParsingError> {
    let keys = ctx.cache.keys().count();
    ctx.state.closed.push(keys);
    Ok(())
}

fn traced(name: &str) -> BlockDef<char, Trace> {
    BlockDef::new(name, three_lines, any)
        .with_fallback(RecordDef::new("trace", trace))
        .with_end_callback(count)
}

#[test]
fn cache_visibility() {
    let parser = ChainParser::new(Sequence::finite(vec![traced("A"), traced("B")]));
    let parsed = parser.parse_str("a\nb\nc\nd\ne\nf").unwrap();
    let expected: Vec<(usize, Vec<String>)> = vec![
        (1, vec![]),
        (2, vec!["line1".to_string()]),
        (3, vec!["line1".to_string(), "line2".to_string()]),
        // cleared at block entry
        (1, vec![]),
        (2, vec!["line1".to_string()]),
        (3, vec!["line1".to_string(), "line2".to_string()]),
    ];
    assert_eq!(parsed.state.visible, expected);
    // end callbacks see the whole block content
    assert_eq!(parsed.state.closed, vec![3, 3]);
    assert!(parsed.diagnostics.warnings().next().is_none());
}

#[test]
fn block_relative_line_numbers() {
    let parser = ChainParser::new(Sequence::repeating(traced("A")));
    let parsed = parser.parse_str("a\nb\nc\nd\ne\nf\ng").unwrap();
    let numbers: Vec<usize> = parsed.state.visible.iter().map(|(n, _)| *n).collect();
    assert_eq!(numbers, vec![1, 2, 3, 1, 2, 3, 1]);
    // last block closed by end of input
    assert_eq!(parsed.blocks.len(), 3);
    assert_eq!(parsed.blocks[2].first_line, 6);
    assert_eq!(parsed.blocks[2].lines, 1);
    assert_eq!(parsed.state.closed, vec![3, 3, 1]);
}

#[test]
fn unseen_blocks() {
    let parser = ChainParser::new(Sequence::finite(vec![traced("A"), traced("B"), traced("C")]));
    let parsed = parser.parse_str("a\nb\nc\nd").unwrap();
    assert!(parsed
        .diagnostics
        .contains(&DiagnosticKind::UnseenBlocks(vec!["C".to_string()])));
    match parsed.strict().map_err(|f| f.error) {
        Err(ParsingError::Strict { count, first }) => {
            assert_eq!(count, 1);
            assert!(first.contains("input ended before block(s): C"));
        },
        _ => panic!("warnings should have been promoted"),
    }
}

#[test]
fn invalid_definitions_fail_early() {
    fn nop(_: &Fields, _: &mut Context<Trace>) -> Result<(), ParsingError> {
        Ok(())
    }
    let record = RecordDef::new("overlapping", nop).with_fields(vec![
        FieldDef::new("a", 0, Some(10)),
        FieldDef::new("b", 5, Some(12)),
    ]);
    let parser = ChainParser::new(Sequence::finite(vec![
        BlockDef::new("A", three_lines, any).with_record('a', record)
    ]));
    match parser.parse_str("a").map_err(|f| f.error) {
        Err(ParsingError::Definition(DefinitionError::OverlappingFields {
            first, second, ..
        })) => {
            assert_eq!(first, "a");
            assert_eq!(second, "b");
        },
        other => panic!("unexpected outcome: {:?}", other.map(|p| p.blocks)),
    }
}

#[test]
fn initial_state_is_populated() {
    let parser = ChainParser::new(Sequence::finite(vec![traced("A")]));
    let initial = Trace {
        visible: vec![(0, vec!["previous".to_string()])],
        closed: vec![],
    };
    let lines = "a\nb".lines().map(|l| Ok(l.to_string()));
    let parsed = parser
        .parse_lines(lines, initial, parser.options())
        .unwrap();
    assert_eq!(parsed.state.visible.len(), 3);
    assert_eq!(parsed.state.visible[0].1, vec!["previous".to_string()]);
}

#[test]
fn encodings() {
    let content: &[u8] = b"Z\xfcrich\nGen\xe8ve\n";
    let parser = ChainParser::new(Sequence::repeating(traced("A")));

    // latin-1 fallback
    let parsed = parser.parse_reader(content).unwrap();
    assert_eq!(parsed.blocks[0].lines, 2);

    let strict = parser
        .options()
        .with_encoding(Encoding::Utf8)
        .with_source("cities.txt");
    let parser = ChainParser::new(Sequence::repeating(traced("A"))).with_options(strict);
    match parser.parse_reader(content).map_err(|f| f.error) {
        Err(ParsingError::Encoding(line)) => assert_eq!(line, 0),
        other => panic!("unexpected outcome: {:?}", other.map(|p| p.blocks)),
    }
}
