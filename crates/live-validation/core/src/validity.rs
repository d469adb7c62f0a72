//! Native constraint-validation state of a form control

use serde::Serialize;
use std::fmt;

/// One of the browser-computed constraint flags consulted by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeFlag {
    BadInput,
    PatternMismatch,
    RangeOverflow,
    RangeUnderflow,
    StepMismatch,
    TooLong,
    TooShort,
    TypeMismatch,
    ValueMissing,
}

impl NativeFlag {
    /// Every flag the engine treats as a native failure.
    ///
    /// `customError` is not part of this set; the engine sets it itself.
    pub const ALL: [NativeFlag; 9] = [
        NativeFlag::BadInput,
        NativeFlag::PatternMismatch,
        NativeFlag::RangeOverflow,
        NativeFlag::RangeUnderflow,
        NativeFlag::StepMismatch,
        NativeFlag::TooLong,
        NativeFlag::TooShort,
        NativeFlag::TypeMismatch,
        NativeFlag::ValueMissing,
    ];

    /// The DOM property name (`ValidityState.badInput` etc.)
    pub fn as_str(&self) -> &'static str {
        match self {
            NativeFlag::BadInput => "badInput",
            NativeFlag::PatternMismatch => "patternMismatch",
            NativeFlag::RangeOverflow => "rangeOverflow",
            NativeFlag::RangeUnderflow => "rangeUnderflow",
            NativeFlag::StepMismatch => "stepMismatch",
            NativeFlag::TooLong => "tooLong",
            NativeFlag::TooShort => "tooShort",
            NativeFlag::TypeMismatch => "typeMismatch",
            NativeFlag::ValueMissing => "valueMissing",
        }
    }
}

impl fmt::Display for NativeFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a control's `ValidityState`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidityState {
    pub bad_input: bool,
    pub pattern_mismatch: bool,
    pub range_overflow: bool,
    pub range_underflow: bool,
    pub step_mismatch: bool,
    pub too_long: bool,
    pub too_short: bool,
    pub type_mismatch: bool,
    pub value_missing: bool,
    pub custom_error: bool,
}

impl ValidityState {
    pub fn flag(&self, flag: NativeFlag) -> bool {
        match flag {
            NativeFlag::BadInput => self.bad_input,
            NativeFlag::PatternMismatch => self.pattern_mismatch,
            NativeFlag::RangeOverflow => self.range_overflow,
            NativeFlag::RangeUnderflow => self.range_underflow,
            NativeFlag::StepMismatch => self.step_mismatch,
            NativeFlag::TooLong => self.too_long,
            NativeFlag::TooShort => self.too_short,
            NativeFlag::TypeMismatch => self.type_mismatch,
            NativeFlag::ValueMissing => self.value_missing,
        }
    }

    /// Flags currently raised, in declaration order
    pub fn failures(&self) -> Vec<NativeFlag> {
        NativeFlag::ALL
            .into_iter()
            .filter(|flag| self.flag(*flag))
            .collect()
    }

    /// True iff none of the nine native flags is set
    pub fn is_natively_valid(&self) -> bool {
        NativeFlag::ALL.iter().all(|flag| !self.flag(*flag))
    }

    /// Browser `validity.valid`: native flags plus the custom error
    pub fn is_valid(&self) -> bool {
        self.is_natively_valid() && !self.custom_error
    }
}
