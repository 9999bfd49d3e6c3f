//! # Frame Classifier
//!
//! Decides whether a stack frame belongs to the program under analysis or to
//! the runtime and system libraries it links against.
//!
//! The decision is pure and total. Missing information resolves to
//! [`FrameClass::Library`], so the engine stops stepping rather than
//! descending into code it cannot attribute.
//!
//! The same [`ClassifierPolicy`] is rendered into the in-debugger stepping
//! helper (see [`crate::driver::script`]), so the debugger halts a session
//! exactly where this classifier would.

use std::fmt;

use crate::types::FrameEvent;

/// Which side of the boundary a frame is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameClass
{
    /// Code of the program under analysis.
    User,
    /// Standard runtime or system library code.
    Library,
}

impl fmt::Display for FrameClass
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Self::User => f.write_str("user"),
            Self::Library => f.write_str("library"),
        }
    }
}

/// The rules a classifier applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierPolicy
{
    /// Path prefixes of system installation roots.
    pub library_prefixes: Vec<String>,
    /// Substrings that mark C runtime sources anywhere in a path.
    pub runtime_markers: Vec<String>,
    /// Entry function of the program, always user code.
    pub entry_function: String,
}

impl Default for ClassifierPolicy
{
    fn default() -> Self
    {
        Self {
            library_prefixes: vec!["/usr/".to_string()],
            runtime_markers: vec!["glibc".to_string(), "libc".to_string()],
            entry_function: "main".to_string(),
        }
    }
}

/// Stateless frame classifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameClassifier
{
    policy: ClassifierPolicy,
}

impl FrameClassifier
{
    /// Create a classifier applying `policy`.
    #[must_use]
    pub fn new(policy: ClassifierPolicy) -> Self
    {
        Self { policy }
    }

    /// Policy this classifier applies.
    #[must_use]
    pub fn policy(&self) -> &ClassifierPolicy
    {
        &self.policy
    }

    /// Classify a frame by its source file and function name.
    ///
    /// Rules, in order:
    /// 1. No resolvable source file: `Library`.
    /// 2. The entry function: `User`, whatever its path.
    /// 3. Path under a library prefix or containing a runtime marker: `Library`.
    /// 4. Anything else: `User`.
    #[must_use]
    pub fn classify(&self, source_file: Option<&str>, function_name: &str) -> FrameClass
    {
        let Some(file) = source_file.filter(|f| !f.is_empty()) else {
            return FrameClass::Library;
        };

        if function_name == self.policy.entry_function {
            return FrameClass::User;
        }

        let under_prefix = self.policy.library_prefixes.iter().any(|p| file.starts_with(p.as_str()));
        let has_marker = self.policy.runtime_markers.iter().any(|m| file.contains(m.as_str()));

        if under_prefix || has_marker {
            FrameClass::Library
        } else {
            FrameClass::User
        }
    }

    /// Classify a parsed frame event.
    #[must_use]
    pub fn classify_event(&self, event: &FrameEvent) -> FrameClass
    {
        self.classify(event.source_file.as_deref(), &event.function_name)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_absent_file_is_library()
    {
        let classifier = FrameClassifier::default();
        assert_eq!(classifier.classify(None, "compute"), FrameClass::Library);
        assert_eq!(classifier.classify(Some(""), "compute"), FrameClass::Library);
    }

    #[test]
    fn test_absent_file_is_library_even_for_entry()
    {
        let classifier = FrameClassifier::default();
        assert_eq!(classifier.classify(None, "main"), FrameClass::Library);
    }

    #[test]
    fn test_system_prefix_is_library()
    {
        let classifier = FrameClassifier::default();
        assert_eq!(
            classifier.classify(Some("/usr/include/x86_64-linux-gnu/bits/stdio2.h"), "printf"),
            FrameClass::Library
        );
    }

    #[test]
    fn test_runtime_marker_is_library()
    {
        let classifier = FrameClassifier::default();
        assert_eq!(
            classifier.classify(Some("/build/glibc-2.35/stdio-common/vfprintf.c"), "__vfprintf_internal"),
            FrameClass::Library
        );
        assert_eq!(
            classifier.classify(Some("../sysdeps/nptl/libc_start_call_main.h"), "__libc_start_call_main"),
            FrameClass::Library
        );
    }

    #[test]
    fn test_entry_function_is_user_regardless_of_path()
    {
        let classifier = FrameClassifier::default();
        assert_eq!(classifier.classify(Some("/usr/src/app/main.c"), "main"), FrameClass::User);
    }

    #[test]
    fn test_user_source_is_user()
    {
        let classifier = FrameClassifier::default();
        assert_eq!(classifier.classify(Some("/home/student/lab1/list.c"), "push"), FrameClass::User);
        assert_eq!(classifier.classify(Some("list.c"), "push"), FrameClass::User);
    }

    #[test]
    fn test_custom_policy()
    {
        let classifier = FrameClassifier::new(ClassifierPolicy {
            library_prefixes: vec!["/opt/sdk/".to_string()],
            runtime_markers: vec!["musl".to_string()],
            entry_function: "app_main".to_string(),
        });

        assert_eq!(classifier.classify(Some("/opt/sdk/lib.c"), "f"), FrameClass::Library);
        assert_eq!(classifier.classify(Some("/src/musl/exit.c"), "exit"), FrameClass::Library);
        assert_eq!(classifier.classify(Some("/opt/sdk/app.c"), "app_main"), FrameClass::User);
        assert_eq!(classifier.classify(Some("/usr/src/app.c"), "helper"), FrameClass::User);
    }
}
