//! Parsers for the log reader's textual output.
//!
//! Commit records are one per line, tab separated:
//!
//! ```text
//! <hash>\t<parent hashes, space separated>\t<author>\t<unix timestamp>\t<subject>
//! ```
//!
//! which is what `git log --format='%H%x09%P%x09%an%x09%at%x09%s'` prints.
//! The subject is the last field and may itself contain tabs.
//!
//! Ref records use `git show-ref` output: `<hash> <refname>`.

use crate::commit::{Commit, CommitHash, Refs};
use crate::error::CoreError;

const FIELD_COUNT: usize = 5;

/// Prefixes stripped from ref names, most specific first.
const REF_PREFIXES: &[&str] = &["refs/heads/", "refs/remotes/", "refs/tags/", "refs/"];

/// Parses every non-blank line of `input` into a commit, keeping order.
pub fn parse_log(input: &str) -> Result<Vec<Commit>, CoreError> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| parse_log_line(line, index + 1))
        .collect()
}

/// Parses one commit record. `line` is the 1-based line number used in
/// error reports.
pub fn parse_log_line(record: &str, line: usize) -> Result<Commit, CoreError> {
    let record = record.strip_suffix('\r').unwrap_or(record);
    let fields: Vec<&str> = record.splitn(FIELD_COUNT, '\t').collect();
    if fields.len() != FIELD_COUNT {
        return Err(malformed(
            line,
            format!("expected {FIELD_COUNT} tab-separated fields, found {}", fields.len()),
        ));
    }

    let hash = CommitHash::parse(fields[0]).map_err(|err| malformed(line, err.to_string()))?;
    let parents = fields[1]
        .split_whitespace()
        .map(CommitHash::parse)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| malformed(line, err.to_string()))?;
    let timestamp: i64 = fields[3]
        .trim()
        .parse()
        .map_err(|_| malformed(line, format!("invalid timestamp '{}'", fields[3])))?;

    Ok(Commit::new(hash, parents, fields[2], timestamp, fields[4]))
}

/// Parses `git show-ref` style output. Names for the same commit are kept
/// in input order; commits keep their first-seen position.
pub fn parse_refs(input: &str) -> Result<Refs, CoreError> {
    let mut refs = Refs::new();
    for (index, record) in input.lines().enumerate() {
        let mut parts = record.split_whitespace();
        let (Some(hash), Some(refname), None) = (parts.next(), parts.next(), parts.next()) else {
            if record.trim().is_empty() {
                continue;
            }
            return Err(malformed(index + 1, "expected '<hash> <refname>'".to_string()));
        };
        let hash = CommitHash::parse(hash).map_err(|err| malformed(index + 1, err.to_string()))?;
        // `show-ref -d` lists the commit an annotated tag points at as `tag^{}`.
        let name = short_ref_name(refname.strip_suffix("^{}").unwrap_or(refname));
        let names = refs.entry(hash).or_default();
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    Ok(refs)
}

/// `refs/heads/main` -> `main`, `refs/remotes/origin/main` -> `origin/main`.
pub fn short_ref_name(refname: &str) -> &str {
    REF_PREFIXES
        .iter()
        .find_map(|prefix| refname.strip_prefix(prefix))
        .unwrap_or(refname)
}

fn malformed(line: usize, reason: String) -> CoreError {
    CoreError::MalformedRecord { line, reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_records_and_skips_blank_lines() {
        let input = "a1\t\tann\t100\tinit\n\nb2\ta1\tbo\t200\tfix:\twith tab\r\nc3\ta1 b2\tann\t300\tmerge\n";
        let commits = parse_log(input).unwrap();
        assert_eq!(commits.len(), 3);

        assert!(commits[0].is_root());
        assert_eq!(commits[1].message, "fix:\twith tab");
        assert_eq!(commits[1].timestamp, 200);
        assert_eq!(commits[2].parents.len(), 2);
        assert_eq!(commits[2].author, "ann");
    }

    #[test]
    fn reports_line_numbers() {
        let input = "a1\t\tann\t100\tinit\n\nb2\ta1\tbo\tlater\tbroken\n";
        match parse_log(input) {
            Err(CoreError::MalformedRecord { line, reason }) => {
                assert_eq!(line, 3);
                assert!(reason.contains("timestamp"), "{reason}");
            }
            other => panic!("expected malformed record, got {other:?}"),
        }
    }

    #[test]
    fn rejects_missing_fields() {
        let err = parse_log_line("a1\t\tann", 7).unwrap_err();
        assert!(matches!(err, CoreError::MalformedRecord { line: 7, .. }));
    }

    #[test]
    fn parses_show_ref_output() {
        let input = "\
c3 refs/heads/main
b2 refs/heads/feature/x
c3 refs/remotes/origin/main
a1 refs/tags/v1.0
a1 refs/tags/v1.0^{}
c3 HEAD
";
        let refs = parse_refs(input).unwrap();
        let keys: Vec<&str> = refs.keys().map(CommitHash::as_str).collect();
        assert_eq!(keys, vec!["c3", "b2", "a1"]);
        assert_eq!(
            refs[&CommitHash::parse("c3").unwrap()],
            vec!["main", "origin/main", "HEAD"]
        );
        assert_eq!(refs[&CommitHash::parse("a1").unwrap()], vec!["v1.0"]);
    }

    #[test]
    fn rejects_malformed_ref_lines() {
        let err = parse_refs("c3\n").unwrap_err();
        assert!(matches!(err, CoreError::MalformedRecord { line: 1, .. }));
    }

    #[test]
    fn short_names() {
        assert_eq!(short_ref_name("refs/heads/main"), "main");
        assert_eq!(short_ref_name("refs/remotes/origin/dev"), "origin/dev");
        assert_eq!(short_ref_name("refs/stash"), "stash");
        assert_eq!(short_ref_name("HEAD"), "HEAD");
    }
}
