//! CSI parameter parsing
//!
//! Handles semicolon-separated parameters and their colon-separated
//! subparameters. `4:3` is one parameter (4) carrying one subparameter (3);
//! `4;3` is two parameters.

/// Default maximum number of values (parameters plus subparameters)
pub const DEFAULT_MAX_PARAMS: usize = 32;

/// CSI parameters
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    /// Parameter values (0 means default/unspecified)
    values: Vec<u32>,
    /// Subparameters following each value, same length as `values`
    subparams: Vec<Vec<u32>>,
}

impl Params {
    /// Create empty params
    pub fn new() -> Self {
        Self::default()
    }

    /// Create params from a slice
    pub fn from_slice(values: &[u32]) -> Self {
        Self {
            values: values.to_vec(),
            subparams: vec![Vec::new(); values.len()],
        }
    }

    /// Parse parameters from bytes, e.g. `b"38:2::10:20:30;1"`.
    ///
    /// Bytes other than digits, `;` and `:` are skipped. Returns `None` if
    /// the input holds more than `max` values.
    pub fn parse(bytes: &[u8], max: usize) -> Option<Self> {
        let mut builder = ParamsBuilder::new(max);
        for &byte in bytes {
            let ok = match byte {
                b'0'..=b'9' => {
                    builder.digit(byte);
                    true
                }
                b';' => builder.next_param(),
                b':' => builder.next_subparam(),
                _ => true,
            };
            if !ok {
                return None;
            }
        }
        builder.finish()
    }

    fn push(&mut self, value: u32) {
        self.values.push(value);
        self.subparams.push(Vec::new());
    }

    fn push_subparam(&mut self, value: u32) {
        if let Some(last) = self.subparams.last_mut() {
            last.push(value);
        } else {
            self.push(value);
        }
    }

    /// Get parameter at index, returning None if not present or 0
    pub fn get(&self, index: usize) -> Option<u32> {
        self.values.get(index).copied().filter(|&v| v != 0)
    }

    /// Get parameter at index with default value
    pub fn get_or(&self, index: usize, default: u32) -> u32 {
        self.get(index).unwrap_or(default)
    }

    /// Get raw value at index (0 if not present)
    pub fn raw(&self, index: usize) -> u32 {
        self.values.get(index).copied().unwrap_or(0)
    }

    /// Get number of parameters
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Subparameters that followed the parameter at `index`
    pub fn subparams(&self, index: usize) -> &[u32] {
        self.subparams.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True if any parameter carries subparameters
    pub fn has_subparams(&self) -> bool {
        self.subparams.iter().any(|s| !s.is_empty())
    }

    /// Iterate over parameters
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.values.iter().copied()
    }

    /// Iterate over parameters with subparameters
    pub fn iter_with_subparams(&self) -> impl Iterator<Item = (u32, &[u32])> + '_ {
        self.values
            .iter()
            .zip(&self.subparams)
            .map(|(&v, sub)| (v, sub.as_slice()))
    }
}

/// Incremental parameter accumulator driven one byte at a time by the parser
#[derive(Debug, Clone)]
pub(crate) struct ParamsBuilder {
    params: Params,
    current: u32,
    has_digit: bool,
    in_subparam: bool,
    count: usize,
    max: usize,
}

impl ParamsBuilder {
    pub(crate) fn new(max: usize) -> Self {
        Self {
            params: Params::new(),
            current: 0,
            has_digit: false,
            in_subparam: false,
            count: 0,
            max,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.params.values.clear();
        self.params.subparams.clear();
        self.current = 0;
        self.has_digit = false;
        self.in_subparam = false;
        self.count = 0;
    }

    pub(crate) fn digit(&mut self, byte: u8) {
        self.has_digit = true;
        self.current = self
            .current
            .saturating_mul(10)
            .saturating_add(u32::from(byte - b'0'));
    }

    /// `;` - returns false once the limit is exceeded
    pub(crate) fn next_param(&mut self) -> bool {
        let ok = self.commit();
        self.in_subparam = false;
        ok
    }

    /// `:` - returns false once the limit is exceeded
    pub(crate) fn next_subparam(&mut self) -> bool {
        let ok = self.commit();
        self.in_subparam = true;
        ok
    }

    /// Close the last value and hand out the finished list
    pub(crate) fn finish(&mut self) -> Option<Params> {
        let pending = self.has_digit || !self.params.is_empty();
        if pending && !self.commit() {
            return None;
        }
        let params = std::mem::take(&mut self.params);
        self.clear();
        Some(params)
    }

    fn commit(&mut self) -> bool {
        self.count += 1;
        if self.count > self.max {
            return false;
        }
        if self.in_subparam {
            self.params.push_subparam(self.current);
        } else {
            self.params.push(self.current);
        }
        self.current = 0;
        self.has_digit = false;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(bytes: &[u8]) -> Params {
        Params::parse(bytes, DEFAULT_MAX_PARAMS).unwrap()
    }

    #[test]
    fn test_params_empty() {
        let params = parse(b"");
        assert!(params.is_empty());
    }

    #[test]
    fn test_params_multiple() {
        let params = parse(b"1;2;3");
        assert_eq!(params.len(), 3);
        assert_eq!(params.get(0), Some(1));
        assert_eq!(params.get(1), Some(2));
        assert_eq!(params.get(2), Some(3));
    }

    #[test]
    fn test_params_default() {
        let params = parse(b";5;");
        assert_eq!(params.len(), 3);
        assert_eq!(params.get(0), None);
        assert_eq!(params.get(1), Some(5));
        assert_eq!(params.get(2), None);
        assert_eq!(params.get_or(0, 1), 1);
        assert_eq!(params.raw(2), 0);
    }

    #[test]
    fn test_params_overflow_saturates() {
        let params = parse(b"99999999999");
        assert_eq!(params.get(0), Some(u32::MAX));
    }

    #[test]
    fn test_colon_is_not_a_new_param() {
        let colon = parse(b"4:3");
        assert_eq!(colon.len(), 1);
        assert_eq!(colon.raw(0), 4);
        assert_eq!(colon.subparams(0), &[3]);

        let semi = parse(b"4;3");
        assert_eq!(semi.len(), 2);
        assert!(!semi.has_subparams());
    }

    #[test]
    fn test_empty_subparam_field() {
        let params = parse(b"38:2::10:20:30;1");
        assert_eq!(params.len(), 2);
        assert_eq!(params.subparams(0), &[2, 0, 10, 20, 30]);
        assert_eq!(params.raw(1), 1);
        assert!(params.subparams(1).is_empty());
    }

    #[test]
    fn test_trailing_colon() {
        let params = parse(b"4:");
        assert_eq!(params.len(), 1);
        assert_eq!(params.subparams(0), &[0]);
    }

    #[test]
    fn test_limit_counts_subparams() {
        assert!(Params::parse(b"1;2;3", 3).is_some());
        assert!(Params::parse(b"1;2;3;4", 3).is_none());
        assert!(Params::parse(b"38:2:1:2", 3).is_none());
    }

    #[test]
    fn test_params_iter() {
        let params = parse(b"1;4:3;2");
        let values: Vec<_> = params.iter().collect();
        assert_eq!(values, vec![1, 4, 2]);

        let with_sub: Vec<_> = params.iter_with_subparams().collect();
        assert_eq!(with_sub[1], (4, &[3][..]));
    }
}
