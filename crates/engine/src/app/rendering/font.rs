//! 3x5 bitmap font. Each glyph is five octal digits, one per row from the
//! top; within a digit the high bit is the leftmost column.

pub const GLYPH_WIDTH: i32 = 3;
pub const GLYPH_HEIGHT: i32 = 5;
pub const GLYPH_ADVANCE: i32 = GLYPH_WIDTH + 1;
pub const LINE_ADVANCE: i32 = GLYPH_HEIGHT + 2;

const FALLBACK: u16 = 0o71302;

const GLYPHS: &[(char, u16)] = &[
    (' ', 0),
    ('!', 0o22202),
    ('"', 0o55000),
    ('#', 0o57575),
    ('%', 0o51245),
    ('\'', 0o22000),
    ('(', 0o12221),
    (')', 0o42224),
    ('*', 0o05250),
    ('+', 0o02720),
    (',', 0o00024),
    ('-', 0o00700),
    ('.', 0o00002),
    ('/', 0o11244),
    ('0', 0o75557),
    ('1', 0o26227),
    ('2', 0o71747),
    ('3', 0o71717),
    ('4', 0o55711),
    ('5', 0o74717),
    ('6', 0o74757),
    ('7', 0o71222),
    ('8', 0o75757),
    ('9', 0o75717),
    (':', 0o02020),
    (';', 0o02024),
    ('<', 0o12421),
    ('=', 0o07070),
    ('>', 0o42124),
    ('?', 0o71302),
    ('@', 0o75747),
    ('A', 0o25755),
    ('B', 0o65656),
    ('C', 0o74447),
    ('D', 0o65556),
    ('E', 0o74647),
    ('F', 0o74644),
    ('G', 0o74557),
    ('H', 0o55755),
    ('I', 0o72227),
    ('J', 0o71157),
    ('K', 0o55655),
    ('L', 0o44447),
    ('M', 0o57755),
    ('N', 0o57775),
    ('O', 0o75557),
    ('P', 0o65644),
    ('Q', 0o75571),
    ('R', 0o65655),
    ('S', 0o74717),
    ('T', 0o72222),
    ('U', 0o55557),
    ('V', 0o55552),
    ('W', 0o55775),
    ('X', 0o55255),
    ('Y', 0o55222),
    ('Z', 0o71247),
    ('[', 0o64446),
    (']', 0o31113),
    ('_', 0o00007),
];

/// Lowercase letters share the uppercase shapes; anything unmapped renders as '?'.
pub fn glyph_bits(ch: char) -> u16 {
    let key = ch.to_ascii_uppercase();
    GLYPHS
        .iter()
        .find(|(glyph_char, _)| *glyph_char == key)
        .map(|(_, bits)| *bits)
        .unwrap_or(FALLBACK)
}

pub fn glyph_pixel_set(bits: u16, column: i32, row: i32) -> bool {
    if !(0..GLYPH_WIDTH).contains(&column) || !(0..GLYPH_HEIGHT).contains(&row) {
        return false;
    }
    let shift = (GLYPH_HEIGHT - 1 - row) * GLYPH_WIDTH + (GLYPH_WIDTH - 1 - column);
    (bits >> shift) & 1 == 1
}

pub fn text_width_px(text: &str) -> i32 {
    let count = text.chars().count() as i32;
    if count == 0 {
        0
    } else {
        count * GLYPH_ADVANCE - 1
    }
}
