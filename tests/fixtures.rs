use glob::glob;
use jsstyle::Config;
use pretty_assertions::assert_eq;

#[test]
fn fixtures_fix_to_expected_output() {
    let config = Config::recommended();
    let mut seen = 0;
    for entry in glob("tests/fixtures/**/input.js").unwrap() {
        let input_path = entry.unwrap();
        let expected_path = input_path.with_file_name("output.js");
        let input = std::fs::read_to_string(&input_path).unwrap();
        let expected = std::fs::read_to_string(&expected_path).unwrap();
        let out = jsstyle::fix_source(&input, &config).unwrap();
        assert_eq!(out, expected, "fixture {}", input_path.display());
        seen += 1;
    }
    assert!(seen > 0, "no fixtures found");
}

#[test]
fn expected_outputs_are_clean() {
    // Fixing an expected output must not change it.
    let config = Config::recommended();
    for entry in glob("tests/fixtures/**/output.js").unwrap() {
        let path = entry.unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let verdict = jsstyle::lint_source(&text, &config).unwrap();
        assert!(verdict.diagnostics.is_empty(), "{}: {:?}", path.display(), verdict.diagnostics);
        assert_eq!(jsstyle::fix_source(&text, &config).unwrap(), text);
    }
}
