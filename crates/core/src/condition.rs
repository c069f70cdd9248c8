//! Packed script conditions.
//!
//! A condition is a signed 16-bit word. Its absolute value holds the variable
//! index in bits 0..=10 and `target + 1` in the bits above; the sign selects
//! between the test and its negation. A target of -1 tests truthiness.

use crate::error::StateResult;
use crate::game_state::GameState;
use crate::platform::InputSource;
use crate::vars::EngineVar;

const VAR_MASK: u16 = 0x7FF;
const TARGET_SHIFT: u32 = 11;

/// What a decoded condition compares the variable against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparison {
    /// `var == target` (or `!=` when negated).
    Equals(i32),
    /// `var != 0` (or `== 0` when negated).
    Truthy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Condition {
    pub var: u16,
    pub comparison: Comparison,
    pub negated: bool,
}

impl Condition {
    pub fn decode(condition: i16) -> Self {
        let unsigned = condition.unsigned_abs();
        let var = unsigned & VAR_MASK;
        let target = i32::from(unsigned >> TARGET_SHIFT) - 1;
        let comparison = if target >= 0 {
            Comparison::Equals(target)
        } else {
            Comparison::Truthy
        };
        Self {
            var,
            comparison,
            negated: condition < 0,
        }
    }

    /// Packs a condition back into its 16-bit form, or `None` if the fields do not fit.
    pub fn encode(self) -> Option<i16> {
        if self.var > VAR_MASK {
            return None;
        }
        let stored_target = match self.comparison {
            Comparison::Truthy => 0,
            Comparison::Equals(target) => u32::try_from(target).ok()? + 1,
        };
        if stored_target > 0x1F {
            return None;
        }
        let unsigned = (stored_target << TARGET_SHIFT) | u32::from(self.var);
        if self.negated {
            // -0 would read back as the positive form.
            if unsigned == 0 {
                return None;
            }
            i16::try_from(-(unsigned as i32)).ok()
        } else {
            i16::try_from(unsigned).ok()
        }
    }

    /// Applies the comparison to a variable value.
    pub fn test(self, value: i32) -> bool {
        let matched = match self.comparison {
            Comparison::Equals(target) => value == target,
            Comparison::Truthy => value != 0,
        };
        matched != self.negated
    }
}

impl GameState {
    /// Evaluates a packed condition against the variable table.
    ///
    /// Input variables are refreshed from `input` right before they are read.
    /// The variable index is masked to the table size, so evaluation cannot fail;
    /// index 0 reads the reserved zero slot.
    pub fn evaluate(&mut self, condition: i16, input: &dyn InputSource) -> bool {
        let decoded = Condition::decode(condition);
        self.refresh_input_var(decoded.var, input);
        decoded.test(self.data.vars.slot(decoded.var))
    }

    fn refresh_input_var(&mut self, var: u16, input: &dyn InputSource) {
        let (engine_var, pressed) = match var {
            v if v == EngineVar::InputMousePressed.index() => {
                (EngineVar::InputMousePressed, input.validate_pressed())
            }
            v if v == EngineVar::InputEscapePressed.index() => {
                (EngineVar::InputEscapePressed, input.escape_pressed())
            }
            v if v == EngineVar::InputTildePressed.index() => {
                (EngineVar::InputTildePressed, input.tilde_pressed())
            }
            v if v == EngineVar::InputSpacePressed.index() => {
                (EngineVar::InputSpacePressed, input.space_pressed())
            }
            _ => return,
        };
        self.set_engine_var(engine_var, i32::from(pressed));
    }

    /// Negative operands reference a variable, others are literal.
    pub fn value_or_var_value(&self, value: i16) -> StateResult<i32> {
        if value < 0 {
            return self.get_var(value.unsigned_abs());
        }
        Ok(i32::from(value))
    }

    /// Formats a condition as `c[<var> <op> <value>]`.
    pub fn describe_condition(&self, condition: i16) -> String {
        let unsigned = condition.unsigned_abs();
        let var = unsigned & VAR_MASK;
        let value = i32::from(unsigned >> TARGET_SHIFT) - 1;
        let op = if (condition >= 0) == (value >= 0) {
            "=="
        } else {
            "!="
        };
        format!(
            "c[{} {} {}]",
            self.describe_var(var),
            op,
            value.max(0)
        )
    }
}

#[cfg(test)]
#[path = "tests/condition_tests.rs"]
mod tests;
