use presence_core::ActiveDocument;
use std::collections::HashMap;

/// Image key used when nothing else matches.
pub const DEFAULT_ICON: &str = "text";

/// File-name suffixes (extensions or whole names) and the image key they map to.
const KNOWN_EXTENSIONS: &[(&str, &str)] = &[
    (".rs", "rust"),
    (".toml", "toml"),
    ("cargo.toml", "cargo"),
    ("cargo.lock", "cargo"),
    (".js", "javascript"),
    (".mjs", "javascript"),
    (".cjs", "javascript"),
    (".jsx", "react"),
    (".ts", "typescript"),
    (".mts", "typescript"),
    (".d.ts", "typescript-def"),
    (".tsx", "react"),
    (".json", "json"),
    ("package.json", "npm"),
    ("package-lock.json", "npm"),
    (".py", "python"),
    (".pyi", "python"),
    (".go", "go"),
    ("go.mod", "go"),
    (".c", "c"),
    (".h", "c"),
    (".cpp", "cpp"),
    (".cc", "cpp"),
    (".cxx", "cpp"),
    (".hpp", "cpp"),
    (".cs", "csharp"),
    (".java", "java"),
    (".kt", "kotlin"),
    (".kts", "kotlin"),
    (".swift", "swift"),
    (".rb", "ruby"),
    (".php", "php"),
    (".lua", "lua"),
    (".zig", "zig"),
    (".hs", "haskell"),
    (".ex", "elixir"),
    (".exs", "elixir"),
    (".erl", "erlang"),
    (".scala", "scala"),
    (".dart", "dart"),
    (".vue", "vue"),
    (".svelte", "svelte"),
    (".html", "html"),
    (".htm", "html"),
    (".css", "css"),
    (".scss", "scss"),
    (".sass", "sass"),
    (".less", "less"),
    (".md", "markdown"),
    (".markdown", "markdown"),
    (".yml", "yaml"),
    (".yaml", "yaml"),
    (".xml", "xml"),
    (".sql", "sql"),
    (".sh", "shell"),
    (".bash", "shell"),
    (".zsh", "shell"),
    (".fish", "shell"),
    (".ps1", "powershell"),
    (".vim", "vim"),
    (".nix", "nix"),
    (".tf", "terraform"),
    (".proto", "protobuf"),
    (".graphql", "graphql"),
    (".gql", "graphql"),
    ("dockerfile", "docker"),
    ("docker-compose.yml", "docker"),
    ("docker-compose.yaml", "docker"),
    ("makefile", "makefile"),
    (".gitignore", "git"),
    (".gitattributes", "git"),
    (".gitmodules", "git"),
    (".env", "env"),
    (".lock", "lock"),
    (".txt", "text"),
];

/// Host language ids and the image key they map to.
const KNOWN_LANGUAGES: &[(&str, &str)] = &[
    ("rust", "rust"),
    ("javascript", "javascript"),
    ("javascriptreact", "react"),
    ("typescript", "typescript"),
    ("typescriptreact", "react"),
    ("python", "python"),
    ("go", "go"),
    ("c", "c"),
    ("cpp", "cpp"),
    ("csharp", "csharp"),
    ("java", "java"),
    ("kotlin", "kotlin"),
    ("swift", "swift"),
    ("ruby", "ruby"),
    ("php", "php"),
    ("lua", "lua"),
    ("haskell", "haskell"),
    ("elixir", "elixir"),
    ("html", "html"),
    ("css", "css"),
    ("markdown", "markdown"),
    ("json", "json"),
    ("jsonc", "json"),
    ("yaml", "yaml"),
    ("toml", "toml"),
    ("xml", "xml"),
    ("sql", "sql"),
    ("shellscript", "shell"),
    ("sh", "shell"),
    ("bash", "shell"),
    ("powershell", "powershell"),
    ("dockerfile", "docker"),
    ("makefile", "makefile"),
    ("vue", "vue"),
    ("svelte", "svelte"),
    ("plaintext", "text"),
];

/// Maps documents to the image key shown next to the presence.
#[derive(Debug, Clone)]
pub struct IconRegistry {
    suffixes: Vec<(String, &'static str)>,
    languages: HashMap<&'static str, &'static str>,
}

impl IconRegistry {
    pub fn new() -> Self {
        let mut suffixes: Vec<(String, &'static str)> = KNOWN_EXTENSIONS
            .iter()
            .map(|(suffix, icon)| (suffix.to_ascii_lowercase(), *icon))
            .collect();
        // longest suffix first, so `.d.ts` beats `.ts`
        suffixes.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        Self {
            suffixes,
            languages: KNOWN_LANGUAGES.iter().copied().collect(),
        }
    }

    /// Resolve by file name first, then by language id.
    pub fn resolve(&self, document: &ActiveDocument) -> &'static str {
        let file_name = document
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        self.detect_by_name(&file_name)
            .or_else(|| self.languages.get(document.language_id.as_str()).copied())
            .unwrap_or(DEFAULT_ICON)
    }

    fn detect_by_name(&self, file_name: &str) -> Option<&'static str> {
        if file_name.is_empty() {
            return None;
        }
        self.suffixes
            .iter()
            .find(|(suffix, _)| {
                let Some(stem) = file_name.strip_suffix(suffix.as_str()) else {
                    return false;
                };
                // whole-name entries only match on a name or extension boundary
                suffix.starts_with('.') || stem.is_empty() || stem.ends_with('.')
            })
            .map(|(_, icon)| *icon)
    }
}

impl Default for IconRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn doc(path: &str, language_id: &str) -> ActiveDocument {
        ActiveDocument {
            path: PathBuf::from(path),
            language_id: language_id.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_extension_match() {
        let registry = IconRegistry::new();
        assert_eq!(registry.resolve(&doc("/w/src/lib.rs", "rust")), "rust");
        assert_eq!(registry.resolve(&doc("/w/App.TSX", "")), "react");
    }

    #[test]
    fn test_longest_suffix_wins() {
        let registry = IconRegistry::new();
        assert_eq!(registry.resolve(&doc("/w/types.d.ts", "typescript")), "typescript-def");
        assert_eq!(registry.resolve(&doc("/w/Cargo.toml", "toml")), "cargo");
        assert_eq!(registry.resolve(&doc("/w/config.toml", "toml")), "toml");
    }

    #[test]
    fn test_whole_name_does_not_match_partial_names() {
        let registry = IconRegistry::new();
        assert_eq!(registry.resolve(&doc("/w/Dockerfile", "")), "docker");
        assert_eq!(registry.resolve(&doc("/w/prod.dockerfile", "")), "docker");
        assert_eq!(registry.resolve(&doc("/w/notadockerfile", "")), DEFAULT_ICON);
    }

    #[test]
    fn test_language_fallback() {
        let registry = IconRegistry::new();
        assert_eq!(registry.resolve(&doc("/w/build", "shellscript")), "shell");
        assert_eq!(registry.resolve(&doc("/w/LICENSE", "plaintext")), "text");
        assert_eq!(registry.resolve(&doc("/w/mystery", "brainfuck")), DEFAULT_ICON);
    }
}
