//! テンプレート展開モジュール
//!
//! ナレーションプロンプト中の `{{列名}}` をアイデアの列の値で置換する。
//! 値がない列は `[列名]` として残し、欠落が見えるようにする。
//!
//! 逆変換（テンプレートとして保存）は、展開済みプロンプトに含まれる列の値を
//! `{{列名}}` に戻す。

use crate::types::FieldSource;
use lazy_static::lazy_static;
use regex::{Captures, NoExpand, Regex, RegexBuilder};

lazy_static! {
    static ref PLACEHOLDER_RE: Regex =
        Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").unwrap();
}

/// 逆変換の対象となる値の最小文字数（これ以下は無視）
const MIN_VALUE_CHARS: usize = 2;

/// テンプレートを展開
///
/// 列名は大文字小文字を区別し、波括弧内の前後の空白は無視する。
/// 置換は1パスで行い、置換後の値を再走査しない。
///
/// # Examples
/// ```
/// use content_ideas_common::render;
/// use std::collections::HashMap;
///
/// let mut fields = HashMap::new();
/// fields.insert("Hewan".to_string(), "Gurita".to_string());
/// assert_eq!(render("{{ Hewan }} dan {{fakta}}", &fields), "Gurita dan [fakta]");
/// ```
pub fn render<F>(template: &str, fields: &F) -> String
where
    F: FieldSource + ?Sized,
{
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            match fields.field(name) {
                Some(value) if !value.is_empty() => value.into_owned(),
                _ => format!("[{}]", name),
            }
        })
        .into_owned()
}

/// 展開済みプロンプトをテンプレートに戻す
///
/// 値が長い列から順に、大文字小文字を区別せず値を `{{列名}}` に置換する。
/// 前後の空白を除いて2文字以下の値は対象外。
///
/// # Arguments
/// * `prompt` - 展開済みプロンプト（前後の空白は除去される）
/// * `fields` - 列の値の取得元
/// * `columns` - 対象とする列名
pub fn to_template<F>(prompt: &str, fields: &F, columns: &[String]) -> String
where
    F: FieldSource + ?Sized,
{
    let mut replacements: Vec<(&str, String)> = columns
        .iter()
        .filter_map(|column| {
            fields
                .field(column)
                .map(|value| (column.as_str(), value.into_owned()))
        })
        .filter(|(_, value)| value.trim().chars().count() > MIN_VALUE_CHARS)
        .collect();

    // 長い値を先に置換（短い値による部分一致を防ぐ）
    replacements.sort_by(|a, b| b.1.chars().count().cmp(&a.1.chars().count()));

    let mut result = prompt.trim().to_string();
    for (column, value) in replacements {
        let pattern = match RegexBuilder::new(&regex::escape(&value))
            .case_insensitive(true)
            .build()
        {
            Ok(re) => re,
            Err(_) => continue,
        };
        let placeholder = format!("{{{{{}}}}}", column);
        result = pattern
            .replace_all(&result, NoExpand(&placeholder))
            .into_owned();
    }
    result
}

/// テンプレート中のプレースホルダ名（出現順・重複なし）
pub fn placeholders(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in PLACEHOLDER_RE.captures_iter(template) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// プロンプトの指定位置（文字単位）に `{{列名}}` を挿入
///
/// 位置が末尾を超える場合は末尾に追加する。
pub fn insert_variable(prompt: &str, at: usize, column: &str) -> String {
    let byte_index = prompt
        .char_indices()
        .nth(at)
        .map(|(i, _)| i)
        .unwrap_or(prompt.len());

    let mut result = String::with_capacity(prompt.len() + column.len() + 4);
    result.push_str(&prompt[..byte_index]);
    result.push_str("{{");
    result.push_str(column);
    result.push_str("}}");
    result.push_str(&prompt[byte_index..]);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Idea;
    use serde_json::json;
    use std::collections::{BTreeMap, HashMap};

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    // =============================================
    // render テスト
    // =============================================

    #[test]
    fn test_render_without_placeholders_is_identity() {
        let f = fields(&[("Hewan", "Gurita")]);
        let t = "Buat narasi tentang hewan laut. {not a placeholder} {{}}";
        assert_eq!(render(t, &f), t);
    }

    #[test]
    fn test_render_missing_field_is_bracketed() {
        let f = fields(&[]);
        assert_eq!(render("Hi {{name}}", &f), "Hi [name]");
    }

    #[test]
    fn test_render_empty_field_is_bracketed() {
        let f = fields(&[("Hewan", "")]);
        assert_eq!(render("membahas {{Hewan}}", &f), "membahas [Hewan]");
    }

    #[test]
    fn test_render_replaces_every_occurrence() {
        let f = fields(&[("Hewan", "Gurita"), ("Idea", "kamuflase")]);
        let t = "Topic : membahas {{Hewan}} tentang {{Idea}}\n[{{Hewan}}] {{ Hewan }}";
        assert_eq!(
            render(t, &f),
            "Topic : membahas Gurita tentang kamuflase\n[Gurita] Gurita"
        );
    }

    #[test]
    fn test_render_is_case_sensitive() {
        let f = fields(&[("Hewan", "Gurita")]);
        assert_eq!(render("{{hewan}} {{Hewan}}", &f), "[hewan] Gurita");
    }

    #[test]
    fn test_render_does_not_rescan_values() {
        let f = fields(&[("a", "{{b}}"), ("b", "x")]);
        assert_eq!(render("{{a}} {{b}}", &f), "{{b}} x");
    }

    #[test]
    fn test_render_value_with_dollar_sign() {
        let f = fields(&[("harga", "$100 & $&")]);
        assert_eq!(render("Harga: {{harga}}", &f), "Harga: $100 & $&");
    }

    #[test]
    fn test_render_with_idea() {
        let mut map = BTreeMap::new();
        map.insert("Idea".to_string(), json!("Semut zombie"));
        map.insert("fakta".to_string(), json!("Jamur Ophiocordyceps"));
        let idea = Idea::new("1", map, "");

        assert_eq!(
            render("{{Idea}}: {{fakta}} ({{Hewan}})", &idea),
            "Semut zombie: Jamur Ophiocordyceps ([Hewan])"
        );
    }

    // =============================================
    // to_template テスト
    // =============================================

    #[test]
    fn test_to_template_round_trip() {
        let t = "Topic : membahas {{Hewan}} tentang {{Idea}}\ndengan fakta {{fakta}}";
        let f = fields(&[
            ("Idea", "Kamuflase sempurna"),
            ("Hewan", "Gurita"),
            ("fakta", "mengubah warna kulit"),
        ]);
        let cols = columns(&["Idea", "Hewan", "fakta"]);

        let rendered = render(t, &f);
        assert_eq!(to_template(&rendered, &f, &cols), t);
    }

    #[test]
    fn test_to_template_case_insensitive() {
        let f = fields(&[("Hewan", "Gurita")]);
        let cols = columns(&["Hewan"]);
        assert_eq!(
            to_template("GURITA dan gurita", &f, &cols),
            "{{Hewan}} dan {{Hewan}}"
        );
    }

    #[test]
    fn test_to_template_longest_value_first() {
        let f = fields(&[("Hewan", "Hiu"), ("Idea", "Hiu Greenland hidup 400 tahun")]);
        let cols = columns(&["Hewan", "Idea"]);
        assert_eq!(
            to_template("Fakta: Hiu Greenland hidup 400 tahun. Hiu itu langka.", &f, &cols),
            "Fakta: {{Idea}}. {{Hewan}} itu langka."
        );
    }

    #[test]
    fn test_to_template_skips_short_values() {
        let f = fields(&[("kode", "ab"), ("spasi", "  x  ")]);
        let cols = columns(&["kode", "spasi"]);
        assert_eq!(to_template("ab  x  ab", &f, &cols), "ab  x  ab");
    }

    #[test]
    fn test_to_template_escapes_metacharacters() {
        let f = fields(&[("rumus", "a+b (c)*")]);
        let cols = columns(&["rumus"]);
        assert_eq!(
            to_template("hasil a+b (c)* dan aab c", &f, &cols),
            "hasil {{rumus}} dan aab c"
        );
    }

    #[test]
    fn test_to_template_trims_prompt() {
        let f = fields(&[]);
        assert_eq!(to_template("  isi  \n", &f, &[]), "isi");
    }

    // =============================================
    // placeholders / insert_variable テスト
    // =============================================

    #[test]
    fn test_placeholders_distinct_in_order() {
        let names = placeholders("{{b}} {{ a }} {{b}} {{c d}}");
        assert_eq!(names, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_insert_variable() {
        assert_eq!(insert_variable("Topic :  ok", 8, "Hewan"), "Topic : {{Hewan}} ok");
        assert_eq!(insert_variable("abc", 99, "x"), "abc{{x}}");
        assert_eq!(insert_variable("🎬 a", 1, "x"), "🎬{{x}} a");
    }
}
