//! Response cleanup for LLM outputs.
//!
//! Models often wrap SQL in markdown fences despite being told not to. Only
//! the fence markers are removed here; any prose left over is for the
//! validator to reject.

const FENCE: &str = "```";

/// Removes markdown code fence markers (and their language tags) and trims.
pub fn strip_code_fences(response: &str) -> String {
    let mut out = String::with_capacity(response.len());
    let mut rest = response;

    while let Some(idx) = rest.find(FENCE) {
        out.push_str(&rest[..idx]);
        rest = skip_language_tag(&rest[idx + FENCE.len()..]);
    }
    out.push_str(rest);

    out.trim().to_string()
}

/// Skips a language tag directly after an opening fence.
///
/// `sql` is always a tag; any other word counts only when it ends the line,
/// so an inline fence such as `` ```SELECT 1``` `` keeps its keyword.
fn skip_language_tag(after_fence: &str) -> &str {
    let tag_len = after_fence
        .find(|c: char| !c.is_ascii_alphanumeric() && c != '-' && c != '_')
        .unwrap_or(after_fence.len());
    if tag_len == 0 {
        return after_fence;
    }

    let (tag, remainder) = after_fence.split_at(tag_len);
    let ends_line = remainder.is_empty() || remainder.starts_with(&['\n', '\r'][..]);
    if tag.eq_ignore_ascii_case("sql") || ends_line {
        remainder
    } else {
        after_fence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_sql_fence() {
        let response = "```sql\nSELECT * FROM health_static;\n```";
        assert_eq!(strip_code_fences(response), "SELECT * FROM health_static;");
    }

    #[test]
    fn test_strips_generic_fence() {
        let response = "```\nSELECT COUNT(*) FROM steps_daily;\n```";
        assert_eq!(strip_code_fences(response), "SELECT COUNT(*) FROM steps_daily;");
    }

    #[test]
    fn test_strips_other_language_tags() {
        assert_eq!(strip_code_fences("```postgresql\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(strip_code_fences("```SQL\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(strip_code_fences("```sql SELECT 1```"), "SELECT 1");
    }

    #[test]
    fn test_inline_fence_keeps_keyword() {
        assert_eq!(strip_code_fences("```SELECT 1```"), "SELECT 1");
    }

    #[test]
    fn test_no_fence_is_trimmed() {
        assert_eq!(strip_code_fences("  SELECT 1;  \n"), "SELECT 1;");
        assert_eq!(strip_code_fences(""), "");
    }

    #[test]
    fn test_prose_is_left_in_place() {
        let response = "Here's the query:\n```sql\nSELECT 1;\n```";
        assert_eq!(strip_code_fences(response), "Here's the query:\n\nSELECT 1;");
    }

    #[test]
    fn test_multiline_sql_preserved() {
        let response = "```sql\nSELECT\n    \"Sex\",\n    AVG(\"BMI\")\nFROM health_static\nGROUP BY \"Sex\";\n```";
        let sql = strip_code_fences(response);
        assert!(sql.starts_with("SELECT\n    \"Sex\""));
        assert!(sql.ends_with("GROUP BY \"Sex\";"));
    }
}
