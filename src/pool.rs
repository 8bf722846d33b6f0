//! Thread-local parser pooling for performance optimization.
//!
//! Eliminates redundant parser creation by maintaining a thread-local pool
//! of reusable parsers. Creates new parser on first use per thread, reuses
//! for subsequent operations. This is what makes the rayon parse phase cheap:
//! each worker thread initializes the Java grammar exactly once.

use crate::java::{JavaParseError, JavaParser};
use std::cell::RefCell;

thread_local! {
    static JAVA_PARSER: RefCell<Option<JavaParser>> = const { RefCell::new(None) };
}

/// Execute function with pooled parser instance.
///
/// On first call per thread, creates new parser. Subsequent calls reuse
/// the same parser instance, avoiding allocation and initialization overhead.
///
/// # Example
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use at_patcher::pool::with_parser;
///
/// let result = with_parser(|parser| {
///     parser.parse_with_source("class A {}").map(|p| p.has_errors())
/// })?;
/// # Ok(())
/// # }
/// ```
pub fn with_parser<F, R>(f: F) -> Result<R, JavaParseError>
where
    F: FnOnce(&mut JavaParser) -> R,
{
    JAVA_PARSER.with(|cell| {
        let mut opt = cell.borrow_mut();
        if opt.is_none() {
            *opt = Some(JavaParser::new()?);
        }
        Ok(f(opt.as_mut().expect("parser was just initialized above")))
    })
}
