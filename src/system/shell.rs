// EN: src/system/shell.rs

use super::executor::RunError;

/// A shell invocation split into its leading environment assignments and the
/// argument vector that launches the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellInvocation {
    /// `NAME=value` words found before the executable, in order of appearance.
    pub env: Vec<String>,
    /// The executable followed by its leading arguments. Never empty.
    pub argv: Vec<String>,
}

impl ShellInvocation {
    /// The executable to launch.
    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }

    /// The arguments that follow the executable.
    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or_default()
    }
}

/// Splits a shell invocation such as `FOO=bar /bin/sh -c` into environment
/// assignments (`["FOO=bar"]`) and argv (`["/bin/sh", "-c"]`).
///
/// Word splitting follows POSIX shell quoting: single quotes, double quotes and
/// backslash escapes. Only the words *before* the first non-assignment count as
/// environment; `/bin/env A=1` keeps `A=1` as an argument.
///
/// # Errors
/// * [`RunError::Parse`] if the string has unbalanced quotes or a dangling escape.
/// * [`RunError::EmptyInvocation`] if no executable word remains.
pub fn tokenize(invocation: &str) -> Result<ShellInvocation, RunError> {
    let words =
        shlex::split(invocation).ok_or_else(|| RunError::Parse(invocation.to_string()))?;

    let split_at = words
        .iter()
        .position(|word| !is_assignment(word))
        .unwrap_or(words.len());
    let mut env = words;
    let argv = env.split_off(split_at);

    if argv.is_empty() {
        return Err(RunError::EmptyInvocation(invocation.to_string()));
    }

    log::trace!("Tokenized shell '{}': env={:?} argv={:?}", invocation, env, argv);
    Ok(ShellInvocation { env, argv })
}

/// True for words shaped like `NAME=value`, where `NAME` is a valid identifier.
pub(crate) fn is_assignment(word: &str) -> bool {
    match word.split_once('=') {
        Some((name, _)) => is_env_name(name),
        None => false,
    }
}

fn is_env_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_ascii_alphabetic() => {
            chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_plain_shell() {
        let shell = tokenize("/bin/bash -c").unwrap();
        assert!(shell.env.is_empty());
        assert_eq!(shell.argv, vec!["/bin/bash", "-c"]);
        assert_eq!(shell.program(), "/bin/bash");
        assert_eq!(shell.args(), ["-c".to_string()]);
    }

    #[test]
    fn test_tokenize_extracts_leading_assignments() {
        let shell = tokenize("FOO=bar BAZ='two words' /bin/sh -c").unwrap();
        assert_eq!(shell.env, vec!["FOO=bar", "BAZ=two words"]);
        assert_eq!(shell.argv, vec!["/bin/sh", "-c"]);
    }

    #[test]
    fn test_tokenize_keeps_assignments_after_program_as_args() {
        let shell = tokenize("/usr/bin/env A=1 sh -c").unwrap();
        assert!(shell.env.is_empty());
        assert_eq!(shell.argv, vec!["/usr/bin/env", "A=1", "sh", "-c"]);
    }

    #[test]
    fn test_tokenize_honors_quotes_and_escapes() {
        let shell = tokenize(r#""/opt/my shell/bin/sh" -c\ x '-e'"#).unwrap();
        assert_eq!(shell.argv, vec!["/opt/my shell/bin/sh", "-c x", "-e"]);
    }

    #[test]
    fn test_tokenize_single_word_has_no_args() {
        let shell = tokenize("sh").unwrap();
        assert_eq!(shell.program(), "sh");
        assert!(shell.args().is_empty());
    }

    #[test]
    fn test_tokenize_unterminated_quote_is_parse_error() {
        let err = tokenize("'unterminated").unwrap_err();
        assert!(matches!(err, RunError::Parse(_)));
    }

    #[test]
    fn test_tokenize_dangling_escape_is_parse_error() {
        assert!(matches!(tokenize("/bin/sh \\").unwrap_err(), RunError::Parse(_)));
    }

    #[test]
    fn test_tokenize_blank_is_empty_invocation() {
        assert!(matches!(tokenize("   ").unwrap_err(), RunError::EmptyInvocation(_)));
    }

    #[test]
    fn test_tokenize_only_assignments_is_empty_invocation() {
        assert!(matches!(tokenize("A=1 B=2").unwrap_err(), RunError::EmptyInvocation(_)));
    }

    #[test]
    fn test_is_assignment() {
        assert!(is_assignment("FOO=bar"));
        assert!(is_assignment("_X1="));
        assert!(!is_assignment("=bar"));
        assert!(!is_assignment("1X=bar"));
        assert!(!is_assignment("--flag=value"));
        assert!(!is_assignment("/bin/sh"));
    }
}
