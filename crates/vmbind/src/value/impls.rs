//! Value constructors, predicates, coercions and trait implementations

use std::rc::Rc;

use super::*;

impl Value {
    // ═══════════════════════════════════════════════════════════════════
    // Constructors
    // ═══════════════════════════════════════════════════════════════════

    /// Create a string value.
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Rc::from(s.as_ref()))
    }

    /// Create a new (unobserved) list.
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(ObservableList::from_vec(items))
    }

    /// Create a new (unobserved) object from key/value pairs.
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Object(ObservedObject::from_entries(entries))
    }

    /// Create a builtin function value.
    pub fn builtin<F>(name: impl Into<String>, arity: i32, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, String> + 'static,
    {
        Value::BuiltinFn(BuiltinFn::new(name, arity, func))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Predicates
    // ═══════════════════════════════════════════════════════════════════

    /// `undefined`
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// `undefined` or `null`
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Closures and builtins.
    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Closure(_) | Value::BuiltinFn(_))
    }

    /// Lists and objects.
    pub fn is_container(&self) -> bool {
        matches!(self, Value::List(_) | Value::Object(_))
    }

    /// Truthiness used by conditions and the logical operators.
    ///
    /// `undefined`, `null`, `false`, `0`, `NaN` and `""` are falsy;
    /// every container and callable is truthy.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Extractors
    // ═══════════════════════════════════════════════════════════════════

    /// Borrow the string contents, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The number, if this is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The boolean, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The list handle, if this is a list.
    pub fn as_list(&self) -> Option<&ObservableList> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    /// The object handle, if this is an object.
    pub fn as_object(&self) -> Option<&ObservedObject> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Coercions
    // ═══════════════════════════════════════════════════════════════════

    /// Numeric conversion.
    ///
    /// Strings are trimmed and parsed (empty means `0`), booleans map to
    /// `0`/`1`, `null` is `0`, and everything unparseable is `NaN`.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => parse_number(s),
            Value::List(_) => parse_number(&self.to_string()),
            Value::Object(_) | Value::Closure(_) | Value::BuiltinFn(_) => f64::NAN,
        }
    }

    /// 32-bit integer conversion used by the bitwise operators.
    pub fn to_i32(&self) -> i32 {
        let n = self.to_number();
        if !n.is_finite() {
            return 0;
        }
        let wrapped = n.trunc().rem_euclid(4_294_967_296.0);
        if wrapped >= 2_147_483_648.0 {
            (wrapped - 4_294_967_296.0) as i32
        } else {
            wrapped as i32
        }
    }

    /// Text shown in the document: `undefined` and `null` become empty.
    pub fn to_text(&self) -> String {
        match self {
            Value::Undefined | Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Loose equality (`==`).
    ///
    /// `null` equals `undefined`; numbers, strings and booleans compare
    /// numerically across kinds; containers compare by identity with
    /// each other and by text with scalars.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
            (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Number(_) | Value::Bool(_) | Value::String(_), Value::Number(_) | Value::Bool(_) | Value::String(_)) => {
                self.to_number() == other.to_number()
            }
            (Value::List(_) | Value::Object(_), Value::String(s))
            | (Value::String(s), Value::List(_) | Value::Object(_)) => {
                let container = if self.is_container() { self } else { other };
                container.to_string() == **s
            }
            (Value::List(_) | Value::Object(_), Value::Number(_) | Value::Bool(_))
            | (Value::Number(_) | Value::Bool(_), Value::List(_) | Value::Object(_)) => {
                self.to_number() == other.to_number()
            }
            _ => self == other,
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Property Access
    // ═══════════════════════════════════════════════════════════════════

    /// Read a named property without failing.
    ///
    /// Objects return the field, lists and strings answer `length` and
    /// numeric indexes, everything else yields `undefined`.
    pub fn get_property(&self, key: &str) -> Value {
        match self {
            Value::Object(object) => object.get(key),
            Value::List(list) => match key {
                "length" => Value::from(list.len()),
                _ => key
                    .parse::<usize>()
                    .map(|i| list.get(i))
                    .unwrap_or(Value::Undefined),
            },
            Value::String(s) => match key {
                "length" => Value::from(s.chars().count()),
                _ => key
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| s.chars().nth(i))
                    .map(|c| Value::string(c.to_string()))
                    .unwrap_or(Value::Undefined),
            },
            _ => Value::Undefined,
        }
    }
}

fn parse_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ if trimmed.starts_with("0x") || trimmed.starts_with("0X") => {
            i64::from_str_radix(&trimmed[2..], 16)
                .map(|n| n as f64)
                .unwrap_or(f64::NAN)
        }
        // Rust accepts "inf"/"nan" spellings that are not numbers here
        _ if trimmed.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => f64::NAN,
        _ => trimmed.parse().unwrap_or(f64::NAN),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Equality
// ═══════════════════════════════════════════════════════════════════════

/// Strict equality: scalars by value, containers by identity, closures
/// structurally, builtins by function pointer. `NaN` is never equal.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b) || a == b,
            (Value::BuiltinFn(a), Value::BuiltinFn(b)) => Rc::ptr_eq(&a.func, &b.func),
            _ => false,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Conversions
// ═══════════════════════════════════════════════════════════════════════

impl Default for Value {
    fn default() -> Self {
        Value::Undefined
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<ObservableList> for Value {
    fn from(list: ObservableList) -> Self {
        Value::List(list)
    }
}

impl From<ObservedObject> for Value {
    fn from(object: ObservedObject) -> Self {
        Value::Object(object)
    }
}

impl From<BuiltinFn> for Value {
    fn from(builtin: BuiltinFn) -> Self {
        Value::BuiltinFn(builtin)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::list(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Undefined.truthy());
        assert!(!Value::from("").truthy());
        assert!(!Value::from(f64::NAN).truthy());
        assert!(Value::from("0").truthy());
        assert!(Value::list(vec![]).truthy());
    }

    #[test]
    fn test_to_number() {
        assert_eq!(Value::from(" 42 ").to_number(), 42.0);
        assert_eq!(Value::from("").to_number(), 0.0);
        assert_eq!(Value::from("0x10").to_number(), 16.0);
        assert!(Value::from("inf").to_number().is_nan());
        assert!(Value::from("abc").to_number().is_nan());
        assert_eq!(Value::Bool(true).to_number(), 1.0);
        assert_eq!(Value::Null.to_number(), 0.0);
    }

    #[test]
    fn test_to_i32_wraps() {
        assert_eq!(Value::from(4_294_967_297.0).to_i32(), 1);
        assert_eq!(Value::from(-1.5).to_i32(), -1);
        assert_eq!(Value::from(2_147_483_648.0).to_i32(), i32::MIN);
    }

    #[test]
    fn test_loose_eq() {
        assert!(Value::Null.loose_eq(&Value::Undefined));
        assert!(Value::from("1").loose_eq(&Value::from(1)));
        assert!(Value::Bool(true).loose_eq(&Value::from(1)));
        assert!(!Value::Null.loose_eq(&Value::from(0)));
        assert!(Value::list(vec![Value::from(1), Value::from(2)]).loose_eq(&Value::from("1,2")));
    }

    #[test]
    fn test_strict_eq_containers_by_identity() {
        let a = Value::list(vec![Value::from(1)]);
        let b = Value::list(vec![Value::from(1)]);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_ne!(Value::from(f64::NAN), Value::from(f64::NAN));
    }

    #[test]
    fn test_get_property() {
        let list = Value::list(vec![Value::from("a"), Value::from("b")]);
        assert_eq!(list.get_property("length"), Value::from(2));
        assert_eq!(list.get_property("1"), Value::from("b"));
        assert_eq!(Value::from("héllo").get_property("length"), Value::from(5));
        assert_eq!(Value::Null.get_property("x"), Value::Undefined);
    }
}
