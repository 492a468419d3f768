use phf::phf_map;

/// Low-group (row) frequencies in Hz.
pub const ROW_FREQS_HZ: [f64; 4] = [697.0, 770.0, 852.0, 941.0];

/// High-group (column) frequencies in Hz.
pub const COL_FREQS_HZ: [f64; 4] = [1209.0, 1336.0, 1477.0, 1633.0];

pub const KEYPAD: [[char; 4]; 4] = [
    ['1', '2', '3', 'A'],
    ['4', '5', '6', 'B'],
    ['7', '8', '9', 'C'],
    ['*', '0', '#', 'D'],
];

/// Every keypad symbol in row-major keypad order.
pub const KEYS: [char; 16] = [
    '1', '2', '3', 'A', '4', '5', '6', 'B', '7', '8', '9', 'C', '*', '0', '#', 'D',
];

static KEY_POSITIONS: phf::Map<char, (usize, usize)> = phf_map! {
    '1' => (0, 0),
    '2' => (0, 1),
    '3' => (0, 2),
    'A' => (0, 3),
    '4' => (1, 0),
    '5' => (1, 1),
    '6' => (1, 2),
    'B' => (1, 3),
    '7' => (2, 0),
    '8' => (2, 1),
    '9' => (2, 2),
    'C' => (2, 3),
    '*' => (3, 0),
    '0' => (3, 1),
    '#' => (3, 2),
    'D' => (3, 3),
};

/// Symbol at the given row/column of the keypad.
///
/// Panics if either index is outside `0..4`.
pub fn key_at(row: usize, col: usize) -> char {
    KEYPAD[row][col]
}

/// Row and column of a keypad symbol. Lowercase `a`-`d` are accepted.
pub fn key_position(key: char) -> Option<(usize, usize)> {
    KEY_POSITIONS.get(&key.to_ascii_uppercase()).copied()
}

/// Low/high frequency pair of a keypad symbol.
pub fn key_frequencies(key: char) -> Option<(f64, f64)> {
    key_position(key).map(|(row, col)| (ROW_FREQS_HZ[row], COL_FREQS_HZ[col]))
}
