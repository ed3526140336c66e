//! APIレスポンスパーサー
//!
//! 生成AIのレスポンスからJSONを抽出し、
//! アイデア一覧・ナレーション結果をパースする

use crate::error::{Error, Result};
use crate::types::ImagePrompt;
use serde::Deserialize;
use serde_json::{Map, Value};

/// アイデア1行分の生データ（列名 → 値）
pub type IdeaRow = Map<String, Value>;

/// ナレーション生成結果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NarrationResult {
    pub narration: String,
    pub image_prompts: Vec<ImagePrompt>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNarration {
    narration: String,
    #[serde(default)]
    image_prompts: Vec<RawImagePrompt>,
}

#[derive(Deserialize)]
struct RawImagePrompt {
    #[serde(default)]
    timestamp: String,
    prompt: String,
}

/// APIレスポンスからJSON部分を抽出
///
/// 抽出優先順位:
/// 1. ```json ... ``` ブロック
/// 2. 先に現れた `{...}` または `[...]`
/// 3. エラー
///
/// # Examples
/// ```
/// use content_ideas_common::extract_json;
///
/// let response = "Berikut hasilnya: [{\"Idea\": \"Gurita\"}]";
/// assert_eq!(extract_json(response).unwrap(), "[{\"Idea\": \"Gurita\"}]");
/// ```
pub fn extract_json(response: &str) -> Result<&str> {
    if let Some(start_marker) = response.find("```json") {
        let start = start_marker + 7;
        if let Some(end_offset) = response[start..].find("```") {
            let end = start + end_offset;
            return Ok(response[start..end].trim());
        }
    }

    let object_start = response.find('{');
    let array_start = response.find('[');
    let (start, close) = match (object_start, array_start) {
        (Some(o), Some(a)) if o < a => (o, '}'),
        (Some(o), None) => (o, '}'),
        (_, Some(a)) => (a, ']'),
        (None, None) => return Err(Error::Parse("JSONが見つかりません".into())),
    };

    match response.rfind(close) {
        Some(end) if end >= start => Ok(&response[start..=end]),
        _ => Err(Error::Parse("JSONが閉じていません".into())),
    }
}

/// アイデア生成レスポンスをパース
///
/// 配列以外のJSONは空の結果として扱う。オブジェクト以外の要素は捨てる。
pub fn parse_ideas_response(response: &str) -> Result<Vec<IdeaRow>> {
    let json_str = extract_json(response)?;
    let value: Value = serde_json::from_str(json_str)
        .map_err(|e| Error::Parse(format!("アイデア JSONパースエラー: {}", e)))?;

    let rows = match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    Ok(rows)
}

/// ナレーション生成レスポンスをパース
///
/// 画像プロンプトは `generated = false` で初期化する
pub fn parse_narration_response(response: &str) -> Result<NarrationResult> {
    let json_str = extract_json(response)?;
    let raw: RawNarration = serde_json::from_str(json_str)
        .map_err(|e| Error::Parse(format!("ナレーション JSONパースエラー: {}", e)))?;

    Ok(NarrationResult {
        narration: raw.narration,
        image_prompts: raw
            .image_prompts
            .into_iter()
            .map(|p| ImagePrompt::new(p.timestamp, p.prompt))
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // =============================================
    // extract_json テスト
    // =============================================

    #[test]
    fn test_extract_json_with_block() {
        let response = "Here:\n```json\n{\"narration\": \"x\"}\n```\nthanks";
        assert_eq!(extract_json(response).unwrap(), "{\"narration\": \"x\"}");
    }

    #[test]
    fn test_extract_json_raw_array() {
        let response = r#"[{"Idea": "a"}]"#;
        assert_eq!(extract_json(response).unwrap(), response);
    }

    #[test]
    fn test_extract_json_object_containing_array() {
        let response = r#"result: {"imagePrompts": [{"prompt": "p"}]} done"#;
        assert_eq!(
            extract_json(response).unwrap(),
            r#"{"imagePrompts": [{"prompt": "p"}]}"#
        );
    }

    #[test]
    fn test_extract_json_array_of_objects() {
        let response = r#"ok [{"a": 1}, {"b": 2}]"#;
        assert_eq!(extract_json(response).unwrap(), r#"[{"a": 1}, {"b": 2}]"#);
    }

    #[test]
    fn test_extract_json_error() {
        assert!(extract_json("No JSON here").is_err());
        assert!(extract_json("} only {").is_err());
    }

    // =============================================
    // parse_ideas_response テスト
    // =============================================

    #[test]
    fn test_parse_ideas_response() {
        let response = r#"[
            {"Idea": "Semut zombie", "Hewan": "Semut", "fakta": "Jamur"},
            {"Idea": "Gurita", "Hewan": "Gurita", "fakta": "Tiga jantung"}
        ]"#;
        let rows = parse_ideas_response(response).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["fakta"], "Tiga jantung");
    }

    #[test]
    fn test_parse_ideas_response_non_array_is_empty() {
        let rows = parse_ideas_response(r#"{"Idea": "x"}"#).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_parse_ideas_response_skips_non_objects() {
        let rows = parse_ideas_response(r#"[{"Idea": "x"}, "y", 3]"#).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_parse_ideas_response_invalid_json() {
        let err = parse_ideas_response("[{broken]").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    // =============================================
    // parse_narration_response テスト
    // =============================================

    #[test]
    fn test_parse_narration_response() {
        let response = r#"{
            "narration": "Ternyata gurita punya tiga jantung.",
            "imagePrompts": [
                {"timestamp": "0-5s", "prompt": "Gurita di dasar laut"},
                {"timestamp": "5-10s", "prompt": "Close up jantung"}
            ]
        }"#;
        let result = parse_narration_response(response).unwrap();

        assert_eq!(result.narration, "Ternyata gurita punya tiga jantung.");
        assert_eq!(result.image_prompts.len(), 2);
        assert_eq!(result.image_prompts[1].timestamp, "5-10s");
        assert!(!result.image_prompts[0].generated);
        assert!(result.image_prompts[0].image_url.is_none());
    }

    #[test]
    fn test_parse_narration_response_missing_narration() {
        let err = parse_narration_response(r#"{"imagePrompts": []}"#).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}
