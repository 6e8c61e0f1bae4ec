//! Token substitution for presence text.

/// Two zero-width spaces; renders as blank but satisfies the endpoint's
/// two-character minimum.
pub const FAKE_EMPTY: &str = "\u{200b}\u{200b}";

const FILE_SIZE_UNITS: [&str; 5] = [" bytes", "kb", "mb", "gb", "tb"];

/// Placeholders recognised inside presence templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    FileName,
    DirName,
    FullDirName,
    Workspace,
    WorkspaceFolder,
    WorkspaceAndFolder,
    LanguageLowerCase,
    LanguageTitleCase,
    LanguageUpperCase,
    TotalLines,
    CurrentLine,
    CurrentColumn,
    FileSize,
    AppName,
    GitRepoName,
    GitBranch,
}

impl Token {
    pub const ALL: [Token; 16] = [
        Token::FileName,
        Token::DirName,
        Token::FullDirName,
        Token::Workspace,
        Token::WorkspaceFolder,
        Token::WorkspaceAndFolder,
        Token::LanguageLowerCase,
        Token::LanguageTitleCase,
        Token::LanguageUpperCase,
        Token::TotalLines,
        Token::CurrentLine,
        Token::CurrentColumn,
        Token::FileSize,
        Token::AppName,
        Token::GitRepoName,
        Token::GitBranch,
    ];

    /// Name between the braces. Case matters: `lang`, `Lang` and `LANG` differ.
    pub fn name(self) -> &'static str {
        match self {
            Token::FileName => "file_name",
            Token::DirName => "dir_name",
            Token::FullDirName => "full_dir_name",
            Token::Workspace => "workspace",
            Token::WorkspaceFolder => "workspace_folder",
            Token::WorkspaceAndFolder => "workspace_and_folder",
            Token::LanguageLowerCase => "lang",
            Token::LanguageTitleCase => "Lang",
            Token::LanguageUpperCase => "LANG",
            Token::TotalLines => "total_lines",
            Token::CurrentLine => "current_line",
            Token::CurrentColumn => "current_column",
            Token::FileSize => "file_size",
            Token::AppName => "app_name",
            Token::GitRepoName => "git_repo_name",
            Token::GitBranch => "git_branch",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

/// Replace every `{token}` in `template` with the resolver's value.
///
/// Unknown placeholders, and tokens the resolver returns `None` for, are
/// kept verbatim. Each distinct token is resolved at most once.
pub fn substitute<F>(template: &str, mut resolve: F) -> String
where
    F: FnMut(Token) -> Option<String>,
{
    let mut resolved: Vec<(Token, Option<String>)> = Vec::new();
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let token = after
            .find('}')
            .and_then(|close| Token::from_name(&after[..close]).map(|t| (t, close)));

        match token {
            Some((token, close)) => {
                let value = match resolved.iter().find(|(t, _)| *t == token) {
                    Some((_, v)) => v.clone(),
                    None => {
                        let v = resolve(token);
                        resolved.push((token, v.clone()));
                        v
                    }
                };
                match value {
                    Some(v) => out.push_str(&v),
                    None => out.push_str(&rest[open..open + close + 2]),
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn to_lower(s: &str) -> String {
    s.to_lowercase()
}

pub fn to_upper(s: &str) -> String {
    s.to_uppercase()
}

/// Lower-case everything, then upper-case the first character.
pub fn to_title(s: &str) -> String {
    let lower = s.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Human-readable size using powers of 1000.
pub fn format_file_size(bytes: u64) -> String {
    if bytes <= 1000 {
        return format!("{bytes}{}", FILE_SIZE_UNITS[0]);
    }
    let mut size = bytes as f64 / 1000.0;
    let mut unit = 1;
    while size > 1000.0 && unit < FILE_SIZE_UNITS.len() - 1 {
        size /= 1000.0;
        unit += 1;
    }
    format!("{size:.2}{}", FILE_SIZE_UNITS[unit])
}

/// Decimal with comma thousands separators.
pub fn format_count(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Pad to the two-character minimum with zero-width spaces.
pub fn pad_text(s: String) -> String {
    let len = s.chars().count();
    if len >= 2 {
        return s;
    }
    let mut padded = s;
    padded.extend(std::iter::repeat('\u{200b}').take(2 - len));
    padded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(token: Token) -> Option<String> {
        match token {
            Token::FileName => Some("main.rs".to_string()),
            Token::LanguageUpperCase => Some("RUST".to_string()),
            Token::Workspace => Some("presence".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_token_names_round_trip() {
        for token in Token::ALL {
            assert_eq!(Token::from_name(token.name()), Some(token));
        }
        assert_eq!(Token::from_name("LANG"), Some(Token::LanguageUpperCase));
        assert_eq!(Token::from_name("Lang"), Some(Token::LanguageTitleCase));
        assert_eq!(Token::from_name("lAng"), None);
    }

    #[test]
    fn test_substitute_basic() {
        assert_eq!(
            substitute("Editing {file_name} in {workspace}", resolver),
            "Editing main.rs in presence"
        );
    }

    #[test]
    fn test_substitute_repeated_token_resolves_once() {
        let mut calls = 0;
        let out = substitute("{file_name} / {file_name}", |t| {
            calls += 1;
            resolver(t)
        });
        assert_eq!(out, "main.rs / main.rs");
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_substitute_keeps_unknown_and_unresolved() {
        assert_eq!(
            substitute("{nope} {git_branch} {LANG}", resolver),
            "{nope} {git_branch} RUST"
        );
        assert_eq!(substitute("{{file_name}}", resolver), "{main.rs}");
        assert_eq!(substitute("open { brace", resolver), "open { brace");
        assert_eq!(substitute("trailing {file_name", resolver), "trailing {file_name");
        assert_eq!(substitute("", resolver), "");
    }

    #[test]
    fn test_substitute_multibyte() {
        assert_eq!(substitute("✏️ {file_name} ✓", resolver), "✏️ main.rs ✓");
    }

    #[test]
    fn test_case_transforms() {
        assert_eq!(to_lower("TypeScript"), "typescript");
        assert_eq!(to_upper("cpp"), "CPP");
        assert_eq!(to_title("javaSCRIPT"), "Javascript");
        assert_eq!(to_title(""), "");
        assert_eq!(to_title("ü"), "Ü");
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 bytes");
        assert_eq!(format_file_size(1000), "1000 bytes");
        assert_eq!(format_file_size(1001), "1.00kb");
        assert_eq!(format_file_size(15_360), "15.36kb");
        assert_eq!(format_file_size(1_000_000), "1000.00kb");
        assert_eq!(format_file_size(2_500_000), "2.50mb");
        assert_eq!(format_file_size(3_000_000_000), "3.00gb");
        assert_eq!(format_file_size(5_000_000_000_000_000), "5000.00tb");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(1_234_567), "1,234,567");
    }

    #[test]
    fn test_pad_text() {
        assert_eq!(pad_text(String::new()), FAKE_EMPTY);
        assert_eq!(pad_text("a".to_string()), "a\u{200b}");
        assert_eq!(pad_text("ok".to_string()), "ok");
    }
}
