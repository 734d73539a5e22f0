use std::fmt;
use std::rc::Rc;

use crate::expr::ExprRef;

/// A formal parameter. The declaration decides value-vs-reference passing;
/// call sites never do.
pub struct Arg {
    name: Rc<str>,
    default: Option<ExprRef>,
    is_reference: bool,
    expected_class: Option<Rc<str>>,
}

impl Arg {
    pub fn by_value(name: impl Into<Rc<str>>) -> Self {
        Self {
            name: name.into(),
            default: None,
            is_reference: false,
            expected_class: None,
        }
    }

    pub fn by_ref(name: impl Into<Rc<str>>) -> Self {
        Self {
            name: name.into(),
            default: None,
            is_reference: true,
            expected_class: None,
        }
    }

    /// Default expression, evaluated in the callee's scope when the caller
    /// omits the argument.
    pub fn with_default(mut self, default: ExprRef) -> Self {
        self.default = Some(default);
        self
    }

    /// Class type hint; a non-conforming argument aborts the call.
    pub fn of_class(mut self, class: impl Into<Rc<str>>) -> Self {
        self.expected_class = Some(class.into());
        self
    }

    pub fn name(&self) -> &Rc<str> {
        &self.name
    }

    pub fn default(&self) -> Option<&ExprRef> {
        self.default.as_ref()
    }

    pub fn is_reference(&self) -> bool {
        self.is_reference
    }

    pub fn expected_class(&self) -> Option<&Rc<str>> {
        self.expected_class.as_ref()
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(class) = &self.expected_class {
            write!(f, "{} ", class)?;
        }
        if self.is_reference {
            write!(f, "&")?;
        }
        write!(f, "${}", self.name)
    }
}
