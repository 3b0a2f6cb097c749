//! A primitive font mapping lower ASCII to seven-segment glyphs.
//!
//! Glyphs never carry the decimal point; that bit belongs to the display's `.` merge rule.

use crate::Segments;

const FIRST_PRINTABLE: u8 = b' ';

/// Glyphs for `' '..='~'`, eight per row.  Bit 0 is segment A, bit 6 is segment G.
const ASCII_GLYPHS: [u8; 95] = [
    // ' ' ! " # $ % & '
    0x00, 0x06, 0x22, 0x7E, 0x6D, 0x52, 0x46, 0x20,
    // ( ) * + , - . /
    0x29, 0x0B, 0x21, 0x70, 0x10, 0x40, 0x00, 0x52,
    // 0 - 7
    0x3F, 0x06, 0x5B, 0x4F, 0x66, 0x6D, 0x7D, 0x07,
    // 8 9 : ; < = > ?
    0x7F, 0x6F, 0x09, 0x0D, 0x61, 0x48, 0x43, 0x53,
    // @ A - G
    0x5F, 0x77, 0x7C, 0x39, 0x5E, 0x79, 0x71, 0x3D,
    // H - O
    0x76, 0x30, 0x1E, 0x75, 0x38, 0x15, 0x37, 0x3F,
    // P - W
    0x73, 0x6B, 0x33, 0x6D, 0x78, 0x3E, 0x3E, 0x2A,
    // X Y Z [ \ ] ^ _
    0x76, 0x6E, 0x5B, 0x39, 0x64, 0x0F, 0x23, 0x08,
    // ` a - g
    0x02, 0x5F, 0x7C, 0x58, 0x5E, 0x7B, 0x71, 0x6F,
    // h - o
    0x74, 0x10, 0x0C, 0x75, 0x30, 0x14, 0x54, 0x5C,
    // p - w
    0x73, 0x67, 0x50, 0x6D, 0x78, 0x1C, 0x1C, 0x14,
    // x y z { | } ~
    0x76, 0x6E, 0x5B, 0x46, 0x30, 0x70, 0x01,
];

/// Look up the glyph for a character code.
///
/// Control codes render blank, which lets a zero-filled message clear the display.  Anything
/// above `~` has no glyph and renders as `?`.
pub fn encode(code: u8) -> Segments {
    if code < FIRST_PRINTABLE {
        return Segments::BLANK;
    }

    let index = (code - FIRST_PRINTABLE) as usize;
    let glyph = ASCII_GLYPHS
        .get(index)
        .copied()
        .unwrap_or(ASCII_GLYPHS[(b'?' - FIRST_PRINTABLE) as usize]);

    Segments::from_glyph(glyph)
}
