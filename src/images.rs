//! 生成画像の保存
//!
//! 画像はセッション中は `data:image/jpeg;base64,...` 形式で保持し、
//! 保存時に `image-<番号>-<区間ラベル>.jpeg` として書き出す。
//! 既存のファイルは上書きせず、`-2`, `-3`, ... を付けて別名にする。

use crate::error::{ContentIdeasError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const JPEG_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

pub fn to_data_url(bytes: &[u8]) -> String {
    format!("{}{}", JPEG_DATA_URL_PREFIX, STANDARD.encode(bytes))
}

/// Data URLから画像バイト列を取り出す
pub fn decode_data_url(url: &str) -> Result<Vec<u8>> {
    let (header, payload) = url
        .split_once(',')
        .ok_or_else(|| ContentIdeasError::ApiParse("Data URLではありません".into()))?;
    if !header.starts_with("data:") || !header.ends_with(";base64") {
        return Err(ContentIdeasError::ApiParse(format!("未対応のData URL: {}", header)));
    }
    STANDARD
        .decode(payload.as_bytes())
        .map_err(|e| ContentIdeasError::ApiParse(format!("画像データのデコードに失敗: {}", e)))
}

/// 保存ファイル名（ラベル中のパス区切り等は `_` に置換）
///
/// 番号は画像プロンプトの順番（1始まり）
pub fn image_file_name(number: usize, label: &str) -> String {
    let label: String = label
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect();
    if label.is_empty() {
        format!("image-{}.jpeg", number)
    } else {
        format!("image-{}-{}.jpeg", number, label)
    }
}

fn with_suffix(file_name: &str, n: usize) -> String {
    match file_name.strip_suffix(".jpeg") {
        Some(stem) => format!("{}-{}.jpeg", stem, n),
        None => format!("{}-{}", file_name, n),
    }
}

/// Data URLの画像をディレクトリに書き出す
///
/// 同名のファイルがあれば連番を付けた名前で書く
pub fn save_data_url(dir: &Path, number: usize, label: &str, url: &str) -> Result<PathBuf> {
    let bytes = decode_data_url(url)?;
    fs::create_dir_all(dir)?;

    let file_name = image_file_name(number, label);
    let mut path = dir.join(&file_name);
    let mut n = 2;
    loop {
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(&bytes)?;
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                path = dir.join(with_suffix(&file_name, n));
                n += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_data_url_roundtrip() {
        let url = to_data_url(&[0xFF, 0xD8, 0xFF]);
        assert_eq!(url, "data:image/jpeg;base64,/9j/");
        assert_eq!(decode_data_url(&url).unwrap(), vec![0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn test_decode_rejects_plain_url() {
        assert!(decode_data_url("https://example.com/a.jpeg").is_err());
        assert!(decode_data_url("no comma").is_err());
    }

    #[test]
    fn test_image_file_name() {
        assert_eq!(image_file_name(1, "0-5s"), "image-1-0-5s.jpeg");
        assert_eq!(image_file_name(2, "../x y"), "image-2-.._x_y.jpeg");
        assert_eq!(image_file_name(3, " "), "image-3.jpeg");
    }

    #[test]
    fn test_save_data_url() {
        let dir = TempDir::new().unwrap();
        let path = save_data_url(dir.path(), 2, "5-10s", &to_data_url(b"jpeg")).unwrap();
        assert_eq!(path.file_name().unwrap(), "image-2-5-10s.jpeg");
        assert_eq!(fs::read(path).unwrap(), b"jpeg");
    }

    #[test]
    fn test_labels_sanitized_alike_keep_both_files() {
        let dir = TempDir::new().unwrap();
        let a = save_data_url(dir.path(), 1, "0:05", &to_data_url(b"first")).unwrap();
        let b = save_data_url(dir.path(), 2, "0/05", &to_data_url(b"second")).unwrap();

        assert_ne!(a, b);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
        assert_eq!(fs::read(a).unwrap(), b"first");
        assert_eq!(fs::read(b).unwrap(), b"second");
    }

    #[test]
    fn test_save_twice_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let first = save_data_url(dir.path(), 1, "0:05", &to_data_url(b"old")).unwrap();
        let second = save_data_url(dir.path(), 1, "0/05", &to_data_url(b"new")).unwrap();

        assert_eq!(second.file_name().unwrap(), "image-1-0_05-2.jpeg");
        assert_eq!(fs::read(first).unwrap(), b"old");
        assert_eq!(fs::read(second).unwrap(), b"new");
    }
}
