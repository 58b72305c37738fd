//! File I/O for the local engine
//!
//! Loading normalizes line breaks to `\n` and remembers the original
//! terminator; saving writes it back and keeps a `~` backup of the
//! previous file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use encoding_rs::{Encoding, EUC_JP, SHIFT_JIS};
use tracing::{debug, warn};

use crate::config::write_atomic;
use crate::engine::{EngineError, EngineResult, LineEnding};

/// Maximum number of path completion candidates
pub const MAX_COMPLETIONS: usize = 100;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

pub const ENCODING_UTF8: &str = "UTF-8";
pub const ENCODING_UTF8_BOM: &str = "UTF-8 BOM";
pub const ENCODING_SHIFT_JIS: &str = "Shift-JIS";
pub const ENCODING_EUC_JP: &str = "EUC-JP";

/// Text decoded from disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedContent {
    pub text: String,
    pub encoding: String,
    pub line_ending: LineEnding,
}

/// Decode file bytes. Anything that is not UTF-8 is tried as Shift-JIS and
/// EUC-JP and the cleaner decode wins, Shift-JIS on a tie.
pub fn decode_content(bytes: &[u8]) -> DecodedContent {
    let line_ending = detect_line_ending(bytes).unwrap_or_else(LineEnding::platform_default);

    let (text, encoding) = if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
        (String::from_utf8_lossy(rest).into_owned(), ENCODING_UTF8_BOM)
    } else {
        match std::str::from_utf8(bytes) {
            Ok(text) => (text.to_string(), ENCODING_UTF8),
            Err(_) => {
                let sjis = decode_with_score(bytes, SHIFT_JIS, ENCODING_SHIFT_JIS);
                let eucjp = decode_with_score(bytes, EUC_JP, ENCODING_EUC_JP);
                let best = if sjis.score <= eucjp.score { sjis } else { eucjp };
                debug!(target: "engine", encoding = best.encoding, score = best.score, "legacy encoding");
                (best.text, best.encoding)
            }
        }
    };

    DecodedContent {
        text: normalize_newlines(&text),
        encoding: encoding.to_string(),
        line_ending,
    }
}

struct ScoredDecode {
    text: String,
    encoding: &'static str,
    /// Lower is better
    score: usize,
}

fn decode_with_score(
    bytes: &[u8],
    encoding: &'static Encoding,
    label: &'static str,
) -> ScoredDecode {
    let (text, _, had_errors) = encoding.decode(bytes);
    let text = text.into_owned();

    let control_penalty = text
        .chars()
        .filter(|&c| c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
        .count();
    let replacement_penalty = text.chars().filter(|&c| c == '\u{FFFD}').count() * 4;
    let error_penalty = usize::from(had_errors) * 10;

    ScoredDecode {
        text,
        encoding: label,
        score: control_penalty + replacement_penalty + error_penalty,
    }
}

/// Encode buffer text for disk in the encoding it was loaded with
fn encode_content(text: &str, encoding: &str) -> Vec<u8> {
    let legacy = match encoding {
        ENCODING_SHIFT_JIS => SHIFT_JIS,
        ENCODING_EUC_JP => EUC_JP,
        ENCODING_UTF8_BOM => {
            let mut bytes = UTF8_BOM.to_vec();
            bytes.extend_from_slice(text.as_bytes());
            return bytes;
        }
        _ => return text.as_bytes().to_vec(),
    };
    let (bytes, _, unmappable) = legacy.encode(text);
    if unmappable {
        warn!(target: "engine", encoding, "characters not representable, written as references");
    }
    bytes.into_owned()
}

/// CRLF wins over LF, LF over CR; `None` when there are no line breaks
pub fn detect_line_ending(bytes: &[u8]) -> Option<LineEnding> {
    if bytes.windows(2).any(|w| w == b"\r\n") {
        Some(LineEnding::CrLf)
    } else if bytes.contains(&b'\n') {
        Some(LineEnding::Lf)
    } else if bytes.contains(&b'\r') {
        Some(LineEnding::Cr)
    } else {
        None
    }
}

pub fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Convert buffer text to the on-disk terminator
pub fn apply_line_ending(text: &str, line_ending: LineEnding) -> String {
    let normalized = normalize_newlines(text);
    match line_ending {
        LineEnding::Lf => normalized,
        other => normalized.replace('\n', other.as_str()),
    }
}

/// Read a file; `Ok(None)` when it does not exist yet
pub fn read_file(path: &Path) -> EngineResult<Option<DecodedContent>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(decode_content(&bytes))),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(EngineError::io("failed to read file", err)),
    }
}

pub fn path_exists(path: &Path) -> bool {
    fs::metadata(path).is_ok()
}

/// Write buffer text through a temp file, backing up any existing file to
/// `<path>~` first
pub fn write_content(
    path: &Path,
    text: &str,
    encoding: &str,
    line_ending: LineEnding,
) -> EngineResult<()> {
    create_backup_if_exists(path)?;

    let bytes = encode_content(&apply_line_ending(text, line_ending), encoding);
    write_atomic(path, &bytes).map_err(|err| EngineError::io("failed to write file", err))?;
    debug!(target: "engine", path = %path.display(), %line_ending, encoding, "wrote file");
    Ok(())
}

pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push("~");
    PathBuf::from(name)
}

fn create_backup_if_exists(path: &Path) -> EngineResult<()> {
    if !path_exists(path) {
        return Ok(());
    }
    let backup = backup_path(path);
    fs::copy(path, &backup).map_err(|err| {
        EngineError::io(format!("failed to create backup {}", backup.display()), err)
    })?;
    Ok(())
}

fn is_separator(c: char) -> bool {
    c == '/' || c == MAIN_SEPARATOR
}

/// Split typed input into the directory part (with its trailing separator)
/// and the partial file name
fn split_path_prefix(input: &str) -> (&str, &str) {
    match input.rfind(is_separator) {
        Some(index) => input.split_at(index + 1),
        None => ("", input),
    }
}

/// Directory entries completing `input`, case-insensitively.
///
/// Candidates keep the typed directory prefix; directories end with a
/// separator. Relative input completes against the working directory.
pub fn path_completions(input: &str) -> EngineResult<Vec<String>> {
    let (dir_part, partial) = split_path_prefix(input);
    let target_dir = if dir_part.is_empty() {
        std::env::current_dir()
            .map_err(|err| EngineError::io("failed to resolve current dir", err))?
    } else {
        PathBuf::from(dir_part)
    };

    let entries = fs::read_dir(&target_dir).map_err(|err| {
        EngineError::io(
            format!("failed to read directory {}", target_dir.display()),
            err,
        )
    })?;

    let partial_lower = partial.to_lowercase();
    let mut matches: Vec<String> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.to_lowercase().starts_with(&partial_lower) {
                return None;
            }
            let mut full = format!("{}{}", dir_part, name);
            if entry.path().is_dir() {
                full.push(MAIN_SEPARATOR);
            }
            Some(full)
        })
        .collect();

    matches.sort();
    matches.truncate(MAX_COMPLETIONS);
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_detect_line_endings() {
        assert_eq!(detect_line_ending(b"a\r\nb\nc"), Some(LineEnding::CrLf));
        assert_eq!(detect_line_ending(b"a\nb"), Some(LineEnding::Lf));
        assert_eq!(detect_line_ending(b"a\rb"), Some(LineEnding::Cr));
        assert_eq!(detect_line_ending(b"ab"), None);
    }

    #[test]
    fn test_decode_normalizes_newlines() {
        let decoded = decode_content(b"one\r\ntwo\r\n");
        assert_eq!(decoded.text, "one\ntwo\n");
        assert_eq!(decoded.encoding, ENCODING_UTF8);
        assert_eq!(decoded.line_ending, LineEnding::CrLf);
    }

    #[test]
    fn test_decode_bom() {
        let decoded = decode_content(b"\xEF\xBB\xBFhi\n");
        assert_eq!(decoded.text, "hi\n");
        assert_eq!(decoded.encoding, ENCODING_UTF8_BOM);
    }

    #[test]
    fn test_decode_shift_jis() {
        // "日本語" followed by a CRLF
        let decoded = decode_content(b"\x93\xFA\x96\x7B\x8C\xEA\r\n");
        assert_eq!(decoded.text, "日本語\n");
        assert_eq!(decoded.encoding, ENCODING_SHIFT_JIS);
        assert_eq!(decoded.line_ending, LineEnding::CrLf);
    }

    #[test]
    fn test_decode_euc_jp() {
        // "日本語" in EUC-JP
        let decoded = decode_content(b"\xC6\xFC\xCB\xDC\xB8\xEC");
        assert_eq!(decoded.text, "日本語");
        assert_eq!(decoded.encoding, ENCODING_EUC_JP);
    }

    #[test]
    fn test_shift_jis_written_back_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sjis.txt");
        let original = b"\x93\xFA\x96\x7B\x8C\xEA\r\n".to_vec();
        fs::write(&path, &original).unwrap();

        let decoded = read_file(&path).unwrap().unwrap();
        write_content(&path, &decoded.text, &decoded.encoding, decoded.line_ending).unwrap();

        assert_eq!(fs::read(&path).unwrap(), original);
    }

    #[test]
    fn test_write_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.txt");
        write_content(&path, "a", ENCODING_UTF8, LineEnding::Lf).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("doc.txt")]);
    }

    #[test]
    fn test_apply_line_ending() {
        assert_eq!(apply_line_ending("a\nb", LineEnding::CrLf), "a\r\nb");
        assert_eq!(apply_line_ending("a\nb", LineEnding::Cr), "a\rb");
        assert_eq!(apply_line_ending("a\nb", LineEnding::Lf), "a\nb");
    }

    #[test]
    fn test_write_restores_line_ending_and_backs_up() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.txt");
        fs::write(&path, b"old\r\n").unwrap();

        write_content(&path, "new\nline", ENCODING_UTF8, LineEnding::CrLf).unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"new\r\nline");
        assert_eq!(fs::read(backup_path(&path)).unwrap(), b"old\r\n");
    }

    #[test]
    fn test_write_new_file_has_no_backup() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fresh.txt");
        write_content(&path, "x", ENCODING_UTF8_BOM, LineEnding::Lf).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"\xEF\xBB\xBFx");
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn test_read_missing_file() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read_file(&dir.path().join("nope")).unwrap(), None);
    }

    #[test]
    fn test_split_path_prefix() {
        assert_eq!(split_path_prefix("/tmp/fo"), ("/tmp/", "fo"));
        assert_eq!(split_path_prefix("/tmp/"), ("/tmp/", ""));
        assert_eq!(split_path_prefix("fo"), ("", "fo"));
        assert_eq!(split_path_prefix(""), ("", ""));
    }

    #[test]
    fn test_path_completions_filters_and_marks_dirs() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Alpha.txt"), "").unwrap();
        fs::write(dir.path().join("alps.md"), "").unwrap();
        fs::write(dir.path().join("beta.txt"), "").unwrap();
        fs::create_dir(dir.path().join("alcove")).unwrap();

        let base = format!("{}{}", dir.path().display(), MAIN_SEPARATOR);
        let found = path_completions(&format!("{}al", base)).unwrap();

        assert_eq!(
            found,
            vec![
                format!("{}Alpha.txt", base),
                format!("{}alcove{}", base, MAIN_SEPARATOR),
                format!("{}alps.md", base),
            ]
        );
    }

    #[test]
    fn test_path_completions_capped() {
        let dir = TempDir::new().unwrap();
        for i in 0..(MAX_COMPLETIONS + 5) {
            fs::write(dir.path().join(format!("f{:03}", i)), "").unwrap();
        }
        let base = format!("{}{}", dir.path().display(), MAIN_SEPARATOR);
        assert_eq!(path_completions(&base).unwrap().len(), MAX_COMPLETIONS);
    }

    #[test]
    fn test_path_completions_missing_dir_is_io_error() {
        let dir = TempDir::new().unwrap();
        let input = format!("{}{}missing{}x", dir.path().display(), MAIN_SEPARATOR, MAIN_SEPARATOR);
        assert!(matches!(path_completions(&input), Err(EngineError::Io { .. })));
    }
}
