//! Placeholder template engine.
//!
//! [`render`] expands the directives below against a [`RevisionInfo`].
//! Anything that is not a recognized directive is copied through literally,
//! so rendering never fails.
//!
//! | Directive | Expansion |
//! |-----------|-----------|
//! | `{!}` | `!` when the tree is dirty |
//! | `{!:<text>}` | `<text>` when the tree is dirty |
//! | `{commit}` | full hash |
//! | `{commit:<n>}` | first `<n>` hash characters, `n` in 5..=40 |
//! | `{date}` / `{date:ymd-}` | `YYYYMMDD` / `YYYY-MM-DD` |
//! | `{time}` / `{time:hms}` | `HHMMSS` |
//! | `{time:hms:}` / `{time:hm}` / `{time:hm:}` / `{time:h}` | `HH:MM:SS` / `HHMM` / `HH:MM` / `HH` |
//! | `{time:o}` | UTC offset, `+0100` |
//! | `{xmin:<year>}` / `{xmin:<year>:<len>}` | hex minutes since Jan 1 of `<year>` |
//!
//! Fixed tokens are substituted before the parameterized ones.

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDate};
use regex::{Captures, Regex};

use crate::revision::RevisionInfo;

/// Format used for revision output when none is given.
pub const DEFAULT_FORMAT: &str = "{!}{commit}";

/// Directive summary shown in the CLI help.
pub const DIRECTIVE_HELP: &[(&str, &str)] = &[
    ("{!}", "Prints ! if modified"),
    ("{!:<text>}", "Prints <text> if modified"),
    ("{commit}", "Prints full commit hash"),
    ("{commit:<length>}", "Prints first <length> chars of commit hash (5-40)"),
    ("{date}", "Prints commit date as YYYYMMDD"),
    ("{date:ymd-}", "Prints commit date as YYYY-MM-DD"),
    ("{time}, {time:hms}", "Prints commit time as HHMMSS"),
    ("{time:hms:}", "Prints commit time as HH:MM:SS"),
    ("{time:hm}", "Prints commit time as HHMM"),
    ("{time:hm:}", "Prints commit time as HH:MM"),
    ("{time:h}", "Prints commit hour as HH"),
    ("{time:o}", "Prints time zone offset like +0100"),
    ("{xmin:<year>}", "Prints minutes since year <year> in hexadecimal"),
    ("{xmin:<year>:<length>}", "Same, zero-padded to <length> digits"),
];

static DIRTY_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{!:([^}]*)\}").expect("valid dirty-text pattern"));

static COMMIT_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{commit:(40|[1-3][0-9]|[5-9])\}").expect("valid commit-prefix pattern")
});

static XMIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{xmin:([0-9]{4})\}").expect("valid xmin pattern"));

static XMIN_PADDED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{xmin:([0-9]{4}):([0-9]{1,2})\}").expect("valid padded xmin pattern")
});

/// Expand every directive in `template` using `info`.
pub fn render(template: &str, info: &RevisionInfo) -> String {
    if !template.contains('{') {
        return template.to_string();
    }

    let ts = info.timestamp();
    let dirty = info.is_dirty();
    let hash = info.hash();

    let fixed = [
        ("{!}", if dirty { "!".to_string() } else { String::new() }),
        ("{commit}", hash.to_string()),
        ("{date}", ts.format("%Y%m%d").to_string()),
        ("{date:ymd-}", ts.format("%Y-%m-%d").to_string()),
        ("{time}", ts.format("%H%M%S").to_string()),
        ("{time:hms}", ts.format("%H%M%S").to_string()),
        ("{time:hms:}", ts.format("%H:%M:%S").to_string()),
        ("{time:hm}", ts.format("%H%M").to_string()),
        ("{time:hm:}", ts.format("%H:%M").to_string()),
        ("{time:h}", ts.format("%H").to_string()),
        ("{time:o}", ts.format("%z").to_string()),
    ];

    let mut out = template.to_string();
    for (token, value) in &fixed {
        if out.contains(*token) {
            out = out.replace(*token, value);
        }
    }

    let out = DIRTY_TEXT.replace_all(&out, |caps: &Captures| {
        if dirty {
            caps[1].to_string()
        } else {
            String::new()
        }
    });

    let out = COMMIT_PREFIX.replace_all(&out, |caps: &Captures| match caps[1].parse::<usize>() {
        Ok(len) => hash.prefix(len).to_string(),
        Err(_) => caps[0].to_string(),
    });

    let out = XMIN.replace_all(&out, |caps: &Captures| {
        caps[1]
            .parse::<i32>()
            .ok()
            .and_then(|year| hex_minutes(ts, year, 1))
            .unwrap_or_else(|| caps[0].to_string())
    });

    let out = XMIN_PADDED.replace_all(&out, |caps: &Captures| {
        let year: Option<i32> = caps[1].parse().ok();
        let width: Option<usize> = caps[2].parse().ok();
        year.zip(width)
            .and_then(|(year, width)| hex_minutes(ts, year, width))
            .unwrap_or_else(|| caps[0].to_string())
    });

    out.into_owned()
}

/// Minutes from Jan 1 00:00 of `year` to `ts`, both read on the commit's wall
/// clock, as lowercase hex zero-padded to `width`. Negative spans get a `-`
/// in front of the padded magnitude.
fn hex_minutes(ts: DateTime<FixedOffset>, year: i32, width: usize) -> Option<String> {
    let epoch = NaiveDate::from_ymd_opt(year, 1, 1)?.and_hms_opt(0, 0, 0)?;
    let minutes = (ts.naive_local() - epoch).num_minutes();
    let sign = if minutes < 0 { "-" } else { "" };
    Some(format!("{sign}{:0width$x}", minutes.unsigned_abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revision::CommitHash;
    use pretty_assertions::assert_eq;

    const HASH: &str = "45d4e32f0a1b2c3d4e5f60718293a4b5c6d7e8f9";

    fn info_at(timestamp: &str, dirty: bool) -> RevisionInfo {
        RevisionInfo::new(
            HASH.parse::<CommitHash>().unwrap(),
            DateTime::parse_from_rfc3339(timestamp).unwrap(),
            dirty,
        )
    }

    fn info(dirty: bool) -> RevisionInfo {
        info_at("2011-12-31T14:30:45+01:00", dirty)
    }

    #[test]
    fn test_assembly_version_example() {
        assert_eq!(
            render("MyApp {commit:8}/{date}", &info(false)),
            "MyApp 45d4e32f/20111231"
        );
    }

    #[test]
    fn test_batch_file_example() {
        assert_eq!(
            render("SET revid={commit:8}", &info(false)),
            "SET revid=45d4e32f"
        );
    }

    #[test]
    fn test_default_format() {
        assert_eq!(render(DEFAULT_FORMAT, &info(false)), HASH);
        assert_eq!(render(DEFAULT_FORMAT, &info(true)), format!("!{HASH}"));
    }

    #[test]
    fn test_commit_prefix_allowed_lengths() {
        for n in 5..=40 {
            let template = format!("{{commit:{n}}}");
            assert_eq!(render(&template, &info(false)), &HASH[..n], "n = {n}");
        }
    }

    #[test]
    fn test_commit_prefix_disallowed_lengths_pass_through() {
        for template in [
            "{commit:0}",
            "{commit:1}",
            "{commit:4}",
            "{commit:05}",
            "{commit:41}",
            "{commit:99}",
            "{commit:}",
            "{commit:x}",
        ] {
            assert_eq!(render(template, &info(false)), template);
        }
    }

    #[test]
    fn test_dirty_marker() {
        assert_eq!(render("v1{!}", &info(true)), "v1!");
        assert_eq!(render("v1{!}", &info(false)), "v1");
    }

    #[test]
    fn test_dirty_text() {
        let template = "{commit:7}{!:-modified (local)}";
        assert_eq!(render(template, &info(true)), "45d4e32-modified (local)");
        assert_eq!(render(template, &info(false)), "45d4e32");
    }

    #[test]
    fn test_dirty_text_empty_and_multiple() {
        assert_eq!(render("a{!:}b{!:x}c{!:y}", &info(true)), "abxcy");
        assert_eq!(render("a{!:}b{!:x}c{!:y}", &info(false)), "abc");
    }

    #[test]
    fn test_dirty_text_stops_at_first_brace() {
        assert_eq!(render("{!:a}b}", &info(true)), "ab}");
    }

    #[test]
    fn test_directive_free_template_is_identity() {
        for template in [
            "",
            "plain text",
            "1.2.3.4",
            "{unknown}",
            "{date:dmy}",
            "{time:x}",
            "{ commit }",
            "{xmin:11}",
            "{xmin:2011:123}",
            "}{",
        ] {
            assert_eq!(render(template, &info(true)), template);
        }
    }

    #[test]
    fn test_date_formats() {
        let info = info(false);
        assert_eq!(render("{date}", &info), "20111231");
        assert_eq!(render("{date:ymd-}", &info), "2011-12-31");
    }

    #[test]
    fn test_time_formats() {
        let info = info(false);
        assert_eq!(render("{time}", &info), "143045");
        assert_eq!(render("{time:hms}", &info), "143045");
        assert_eq!(render("{time:hms:}", &info), "14:30:45");
        assert_eq!(render("{time:hm}", &info), "1430");
        assert_eq!(render("{time:hm:}", &info), "14:30");
        assert_eq!(render("{time:h}", &info), "14");
        assert_eq!(render("{time:o}", &info), "+0100");
    }

    #[test]
    fn test_negative_offset() {
        let info = info_at("2020-02-29T08:05:09-05:30", false);
        assert_eq!(render("{date:ymd-}T{time:hms:}{time:o}", &info), "2020-02-29T08:05:09-0530");
    }

    #[test]
    fn test_xmin_minutes_since_year() {
        // 364 days + 14:30 into 2011 = 525030 minutes = 0x802e6
        assert_eq!(render("{xmin:2011}", &info(false)), "802e6");
        assert_eq!(render("{xmin:2011:8}", &info(false)), "000802e6");
    }

    #[test]
    fn test_xmin_width_is_a_minimum() {
        assert_eq!(render("{xmin:2011:2}", &info(false)), "802e6");
        assert_eq!(render("{xmin:2011:0}", &info(false)), "802e6");
    }

    #[test]
    fn test_xmin_zero_minutes() {
        let info = info_at("2015-01-01T00:00:30+00:00", false);
        assert_eq!(render("{xmin:2015}", &info), "0");
        assert_eq!(render("{xmin:2015:4}", &info), "0000");
    }

    #[test]
    fn test_xmin_negative() {
        // 9h29m15s before 2012-01-01, truncated to -569 minutes = -0x239
        assert_eq!(render("{xmin:2012}", &info(false)), "-239");
        assert_eq!(render("{xmin:2012:4}", &info(false)), "-0239");
    }

    #[test]
    fn test_xmin_uses_commit_wall_clock() {
        let east = info_at("2016-01-01T01:00:00+01:00", false);
        let west = info_at("2016-01-01T01:00:00-08:00", false);
        assert_eq!(render("{xmin:2016:4}", &east), "003c");
        assert_eq!(render("{xmin:2016:4}", &west), "003c");
    }

    #[test]
    fn test_xmin_padded_exact_width() {
        let info = info(false);
        for len in 5..=12 {
            let out = render(&format!("{{xmin:2011:{len}}}"), &info);
            assert_eq!(out.len(), len);
            assert_eq!(u64::from_str_radix(&out, 16).unwrap(), 525030);
        }
    }

    #[test]
    fn test_mixed_template() {
        let template = "{commit:10}{!:+dirty} built {date:ymd-} {time:hm:} ({xmin:2010:6})";
        assert_eq!(
            render(template, &info(true)),
            "45d4e32f0a+dirty built 2011-12-31 14:30 (100806)"
        );
    }

    #[test]
    fn test_fixed_tokens_expand_before_conditional() {
        assert_eq!(render("{!:{date}}", &info(true)), "20111231");
        assert_eq!(render("{!:{date}}", &info(false)), "");
    }

    #[test]
    fn test_sentinel_revision() {
        let info = RevisionInfo::sentinel(
            DateTime::parse_from_rfc3339("2030-06-15T12:00:00+00:00").unwrap(),
        );
        assert_eq!(render("{commit:8}{!}", &info), "00000000");
    }
}
