//! Attribute-line patcher for assembly info files.
//!
//! Rewrites the quoted value of every `AssemblyInformationalVersion`
//! attribute line through the template engine and copies all other lines
//! through unchanged. The attribute brackets depend on the output language:
//! `[assembly: ...]` for `.cs`, `<assembly: ...>` for `.vb`.
//!
//! The source encoding is detected from its byte-order mark and preserved,
//! as are the line terminators of each line.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::revision::RevisionInfo;
use crate::template::render;

static SQUARE_ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| attribute_pattern(BracketStyle::Square));

static ANGLE_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| attribute_pattern(BracketStyle::Angle));

fn attribute_pattern(style: BracketStyle) -> Regex {
    let (open, close) = style.delimiters();
    Regex::new(&format!(
        r#"(?i)^(\s*{open}\s*assembly\s*:\s*AssemblyInformationalVersion\s*\(\s*")(.*)("\s*\)\s*{close}.*)$"#,
        open = regex::escape(&open.to_string()),
        close = regex::escape(&close.to_string()),
    ))
    .expect("valid attribute pattern")
}

/// Errors from patching a file.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("unsupported output file extension: {0:?}")]
    UnsupportedOutputFormat(String),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Attribute bracket pair of the output language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BracketStyle {
    /// C#: `[assembly: ...]`
    Square,
    /// Visual Basic: `<assembly: ...>`
    Angle,
}

impl BracketStyle {
    /// Pick the style from the output file extension, case-insensitively.
    pub fn from_output_path(path: &Path) -> Result<Self, PatchError> {
        let ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default();
        match ext.as_str() {
            ".cs" => Ok(Self::Square),
            ".vb" => Ok(Self::Angle),
            _ => Err(PatchError::UnsupportedOutputFormat(ext)),
        }
    }

    pub fn delimiters(self) -> (char, char) {
        match self {
            Self::Square => ('[', ']'),
            Self::Angle => ('<', '>'),
        }
    }

    fn pattern(self) -> &'static Regex {
        match self {
            Self::Square => &SQUARE_ATTRIBUTE,
            Self::Angle => &ANGLE_ATTRIBUTE,
        }
    }
}

/// Character encoding of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// UTF-8 without a byte-order mark.
    Utf8,
    /// UTF-8 with a byte-order mark.
    Utf8Bom,
    Utf16Le,
    Utf16Be,
    Utf32Le,
    Utf32Be,
    /// Fallback for input that is not valid UTF-8: one byte per character.
    Latin1,
}

impl TextEncoding {
    /// Sniff the encoding from the byte-order mark, falling back to UTF-8
    /// when the bytes are valid UTF-8 and Latin-1 otherwise.
    pub fn detect(bytes: &[u8]) -> Self {
        match bytes {
            [0xEF, 0xBB, 0xBF, ..] => Self::Utf8Bom,
            [0xFF, 0xFE, 0x00, 0x00, ..] => Self::Utf32Le,
            [0x00, 0x00, 0xFE, 0xFF, ..] => Self::Utf32Be,
            [0xFF, 0xFE, ..] => Self::Utf16Le,
            [0xFE, 0xFF, ..] => Self::Utf16Be,
            _ if std::str::from_utf8(bytes).is_ok() => Self::Utf8,
            _ => Self::Latin1,
        }
    }

    fn bom(self) -> &'static [u8] {
        match self {
            Self::Utf8Bom => &[0xEF, 0xBB, 0xBF],
            Self::Utf16Le => &[0xFF, 0xFE],
            Self::Utf16Be => &[0xFE, 0xFF],
            Self::Utf32Le => &[0xFF, 0xFE, 0x00, 0x00],
            Self::Utf32Be => &[0x00, 0x00, 0xFE, 0xFF],
            Self::Utf8 | Self::Latin1 => &[],
        }
    }

    /// Decode `bytes`, dropping the byte-order mark.
    pub fn decode(self, bytes: &[u8]) -> String {
        let body = bytes.strip_prefix(self.bom()).unwrap_or(bytes);
        match self {
            Self::Utf8 | Self::Utf8Bom => String::from_utf8_lossy(body).into_owned(),
            Self::Utf16Le => decode_utf16(body, u16::from_le_bytes),
            Self::Utf16Be => decode_utf16(body, u16::from_be_bytes),
            Self::Utf32Le => decode_utf32(body, u32::from_le_bytes),
            Self::Utf32Be => decode_utf32(body, u32::from_be_bytes),
            Self::Latin1 => body.iter().map(|&b| char::from(b)).collect(),
        }
    }

    /// Encode `text`, writing the byte-order mark first when the encoding
    /// has one.
    pub fn encode(self, text: &str) -> Vec<u8> {
        let mut out = self.bom().to_vec();
        match self {
            Self::Utf8 | Self::Utf8Bom => out.extend_from_slice(text.as_bytes()),
            Self::Utf16Le => out.extend(text.encode_utf16().flat_map(u16::to_le_bytes)),
            Self::Utf16Be => out.extend(text.encode_utf16().flat_map(u16::to_be_bytes)),
            Self::Utf32Le => out.extend(text.chars().flat_map(|c| u32::from(c).to_le_bytes())),
            Self::Utf32Be => out.extend(text.chars().flat_map(|c| u32::from(c).to_be_bytes())),
            Self::Latin1 => out.extend(text.chars().map(|c| u8::try_from(c).unwrap_or(b'?'))),
        }
        out
    }
}

fn decode_utf16(body: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let mut chunks = body.chunks_exact(2);
    let units: Vec<u16> = chunks.by_ref().map(|c| unit([c[0], c[1]])).collect();
    let mut text: String = char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect();
    if !chunks.remainder().is_empty() {
        text.push(char::REPLACEMENT_CHARACTER);
    }
    text
}

fn decode_utf32(body: &[u8], unit: fn([u8; 4]) -> u32) -> String {
    let mut chunks = body.chunks_exact(4);
    let mut text: String = chunks
        .by_ref()
        .map(|c| unit([c[0], c[1], c[2], c[3]]))
        .map(|u| char::from_u32(u).unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect();
    if !chunks.remainder().is_empty() {
        text.push(char::REPLACEMENT_CHARACTER);
    }
    text
}

/// Rewrites attribute lines for one bracket style and revision.
pub struct AttributePatcher<'a> {
    pattern: &'static Regex,
    info: &'a RevisionInfo,
}

impl<'a> AttributePatcher<'a> {
    pub fn new(style: BracketStyle, info: &'a RevisionInfo) -> Self {
        Self {
            pattern: style.pattern(),
            info,
        }
    }

    /// Rewrite `line` (without its terminator) if it is an attribute line.
    pub fn patch_line<'l>(&self, line: &'l str) -> Cow<'l, str> {
        match self.pattern.captures(line) {
            Some(caps) => Cow::Owned(self.expand(&caps)),
            None => Cow::Borrowed(line),
        }
    }

    /// Lazily rewrite a stream of lines.
    pub fn patch_lines<'l, I>(&'l self, lines: I) -> impl Iterator<Item = Cow<'l, str>> + 'l
    where
        I: IntoIterator<Item = &'l str>,
        I::IntoIter: 'l,
    {
        lines.into_iter().map(move |line| self.patch_line(line))
    }

    /// Rewrite a whole document, keeping each line's terminator. Returns the
    /// new text and the number of rewritten lines.
    pub fn patch_text(&self, text: &str) -> (String, usize) {
        text.split_inclusive('\n')
            .map(split_terminator)
            .map(|(body, eol)| (self.patch_line(body), eol))
            .fold(
                (String::with_capacity(text.len()), 0),
                |(mut out, patched), (line, eol)| {
                    let rewritten = matches!(line, Cow::Owned(_));
                    if rewritten {
                        tracing::debug!("Found AssemblyInformationalVersion attribute");
                    }
                    out.push_str(&line);
                    out.push_str(eol);
                    (out, patched + usize::from(rewritten))
                },
            )
    }

    fn expand(&self, caps: &Captures<'_>) -> String {
        format!("{}{}{}", &caps[1], render(&caps[2], self.info), &caps[3])
    }
}

fn split_terminator(segment: &str) -> (&str, &str) {
    if let Some(body) = segment.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = segment.strip_suffix('\n') {
        (body, "\n")
    } else {
        (segment, "")
    }
}

/// Outcome of a successful [`patch_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchReport {
    /// Number of attribute lines rewritten.
    pub attributes: usize,
    /// Encoding detected in the input and used for the output.
    pub encoding: TextEncoding,
}

/// Patch `input` into `output`. The output extension is checked before any
/// file is touched, and the output is written in one piece.
pub async fn patch_file(
    input: &Path,
    output: &Path,
    info: &RevisionInfo,
) -> Result<PatchReport, PatchError> {
    let style = BracketStyle::from_output_path(output)?;

    let bytes = tokio::fs::read(input)
        .await
        .map_err(|source| PatchError::Read {
            path: input.to_path_buf(),
            source,
        })?;
    let encoding = TextEncoding::detect(&bytes);
    let text = encoding.decode(&bytes);

    let (patched, attributes) = AttributePatcher::new(style, info).patch_text(&text);

    tokio::fs::write(output, encoding.encode(&patched))
        .await
        .map_err(|source| PatchError::Write {
            path: output.to_path_buf(),
            source,
        })?;

    tracing::debug!(
        input = %input.display(),
        output = %output.display(),
        attributes,
        ?encoding,
        "Patched file"
    );
    Ok(PatchReport {
        attributes,
        encoding,
    })
}
