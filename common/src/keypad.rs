use crate::{
    arbiter::Actuator,
    thresholds::{Direction, ThresholdParam},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Adjust(ThresholdParam, Direction),
    /// Flip the display between readings and thresholds.
    Print,
    Reset,
    Toggle(Actuator),
}

/// 4x4 matrix layout:
///
/// ```text
/// 1 2 3 A
/// 4 5 6 B
/// 7 8 9 C
/// * 0 # D
/// ```
pub fn key_action(symbol: char) -> Option<KeyAction> {
    use Direction::{Down, Up};
    use ThresholdParam::*;

    let action = match symbol {
        '1' => KeyAction::Adjust(TempUpper, Up),
        '2' => KeyAction::Adjust(TempUpper, Down),
        '3' => KeyAction::Adjust(TempLower, Up),
        'A' => KeyAction::Adjust(TempLower, Down),
        '4' => KeyAction::Adjust(HumidityUpper, Up),
        '5' => KeyAction::Adjust(HumidityUpper, Down),
        '6' => KeyAction::Adjust(HumidityLower, Up),
        'B' => KeyAction::Adjust(HumidityLower, Down),
        '7' => KeyAction::Adjust(LuxUpper, Up),
        '8' => KeyAction::Adjust(LuxUpper, Down),
        '9' => KeyAction::Adjust(LuxLower, Up),
        'C' => KeyAction::Adjust(LuxLower, Down),
        '*' => KeyAction::Print,
        '0' => KeyAction::Reset,
        '#' => KeyAction::Toggle(Actuator::Tap),
        'D' => KeyAction::Toggle(Actuator::Buzzer),
        _ => return None,
    };
    Some(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_matrix_key_is_mapped() {
        for symbol in "123A456B789C*0#D".chars() {
            assert!(key_action(symbol).is_some(), "{symbol} unmapped");
        }
    }

    #[test]
    fn control_keys() {
        assert_eq!(key_action('#'), Some(KeyAction::Toggle(Actuator::Tap)));
        assert_eq!(key_action('D'), Some(KeyAction::Toggle(Actuator::Buzzer)));
        assert_eq!(key_action('*'), Some(KeyAction::Print));
        assert_eq!(key_action('0'), Some(KeyAction::Reset));
    }

    #[test]
    fn lux_lower_keys() {
        assert_eq!(
            key_action('9'),
            Some(KeyAction::Adjust(ThresholdParam::LuxLower, Direction::Up))
        );
        assert_eq!(
            key_action('C'),
            Some(KeyAction::Adjust(ThresholdParam::LuxLower, Direction::Down))
        );
    }

    #[test]
    fn unknown_symbols_are_ignored() {
        assert_eq!(key_action('x'), None);
        assert_eq!(key_action('a'), None);
    }
}
