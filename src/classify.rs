use crate::model::Category;
use std::collections::HashMap;

pub const BINARY_TYPE: &str = "Binary";
pub const OTHER_TYPE: &str = "Other";

/// File-type label for a path, from its lowercased extension. Unknown
/// extensions classify as `Other`; known binary extensions as `Binary`.
pub fn file_type(path: &str) -> &'static str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name {
        "Dockerfile" => return "Docker",
        "Makefile" => return "Makefile",
        _ => {}
    }
    let Some((_, ext)) = name.rsplit_once('.') else {
        return OTHER_TYPE;
    };
    match ext.to_ascii_lowercase().as_str() {
        "ts" | "tsx" => "TypeScript",
        "js" | "jsx" | "mjs" | "cjs" => "JavaScript",
        "py" => "Python",
        "rs" => "Rust",
        "go" => "Go",
        "java" => "Java",
        "kt" | "kts" => "Kotlin",
        "c" | "h" => "C",
        "cpp" | "cc" | "cxx" | "hpp" | "hh" => "C++",
        "cs" => "C#",
        "rb" => "Ruby",
        "php" => "PHP",
        "swift" => "Swift",
        "vue" => "Vue",
        "svelte" => "Svelte",
        "sh" | "bash" | "zsh" => "Shell",
        "sql" => "SQL",
        "html" | "htm" => "HTML",
        "css" | "scss" | "sass" | "less" => "CSS",
        "md" | "markdown" => "Markdown",
        "txt" | "rst" => "Text",
        "json" => "JSON",
        "yaml" | "yml" => "YAML",
        "toml" => "TOML",
        "xml" => "XML",
        "lock" => "Lockfile",
        "gradle" => "Gradle",
        "png" | "jpg" | "jpeg" | "gif" | "bmp" | "ico" | "webp" | "woff" | "woff2" | "ttf"
        | "otf" | "eot" | "pdf" | "zip" | "gz" | "tar" | "tgz" | "jar" | "war" | "exe" | "dll"
        | "so" | "dylib" | "o" | "a" | "bin" | "dat" | "wasm" | "class" | "pyc" | "mp3" | "mp4"
        | "mov" | "avi" | "webm" => BINARY_TYPE,
        _ => OTHER_TYPE,
    }
}

fn default_category(file_type: &str) -> Category {
    match file_type {
        "TypeScript" | "JavaScript" | "Python" | "Rust" | "Go" | "Java" | "Kotlin" | "C"
        | "C++" | "C#" | "Ruby" | "PHP" | "Swift" | "Vue" | "Svelte" | "SQL" | "HTML" | "CSS" => {
            Category::Application
        }
        "Markdown" | "Text" => Category::Documentation,
        "JSON" | "YAML" | "TOML" | "XML" | "Lockfile" | "Gradle" | "Shell" | "Docker"
        | "Makefile" => Category::Build,
        _ => Category::Other,
    }
}

/// Test-looking paths win over the label table, which cannot express
/// test-ness on its own.
pub fn is_test_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    if lower.contains(".test.") || lower.contains(".spec.") {
        return true;
    }
    if lower
        .split('/')
        .any(|segment| segment == "test" || segment == "tests" || segment == "__tests__")
    {
        return true;
    }
    let name = lower.rsplit('/').next().unwrap_or(&lower);
    match name.rsplit_once('.') {
        Some((stem, _)) => stem.ends_with("_test"),
        None => false,
    }
}

pub fn category_for(
    path: &str,
    file_type: &str,
    overrides: &HashMap<String, Category>,
) -> Category {
    if is_test_path(path) {
        return Category::Test;
    }
    if let Some(category) = overrides.get(file_type) {
        return *category;
    }
    default_category(file_type)
}
