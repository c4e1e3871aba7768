//! Built-in 8x8 bitmap face, the last-resort default when no outline font
//! can be found on the machine.

use super::mask::CoverageMask;

const CELL: u32 = 8;

/// Pixel scale for a requested font size
pub fn scale_for(font_size: u32) -> u32 {
    (font_size / CELL).max(1)
}

/// Bottom edge of the reference glyph `A`, measured from the line top
pub fn reference_height(font_size: u32) -> u32 {
    let rows = glyph('A').map(|bitmap| {
        bitmap.iter().rposition(|&row| row != 0).map_or(0, |last| last as u32 + 1)
    });
    rows.unwrap_or(CELL).saturating_mul(scale_for(font_size))
}

/// Rasterize one line. Unknown characters advance without painting.
///
/// Returns `None` when the line would not fit in a mask.
pub fn rasterize_line(line: &str, font_size: u32, padding: u32) -> Option<CoverageMask> {
    let scale = scale_for(font_size);
    let advance = CELL.checked_mul(scale)?;
    let chars = u32::try_from(line.chars().count()).ok()?;
    let pad = i32::try_from(padding).ok()?;
    let margin = padding.checked_mul(2)?;

    let width = chars.checked_mul(advance)?.checked_add(margin)?;
    let height = advance.checked_add(margin)?;
    let mut mask = CoverageMask::new(width, height, -pad, -pad)?;

    for (i, ch) in line.chars().enumerate() {
        let Some(bitmap) = glyph(ch) else { continue };
        let cell_x = (i as u32 * advance) as i32;

        for (row, bits) in bitmap.iter().enumerate() {
            for col in 0..CELL {
                if (bits >> (7 - col)) & 1 == 0 {
                    continue;
                }
                for sy in 0..scale {
                    for sx in 0..scale {
                        let x = cell_x + (col * scale + sx) as i32;
                        let y = (row as u32 * scale + sy) as i32;
                        mask.add(x, y, 1.0);
                    }
                }
            }
        }
    }

    Some(mask)
}

/// Glyph rows, most significant bit leftmost. Lowercase maps to uppercase.
fn glyph(ch: char) -> Option<[u8; 8]> {
    let bitmap = match ch.to_ascii_uppercase() {
        ' ' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
        'A' => [0x18, 0x24, 0x42, 0x42, 0x7E, 0x42, 0x42, 0x00],
        'B' => [0x7C, 0x42, 0x42, 0x7C, 0x42, 0x42, 0x7C, 0x00],
        'C' => [0x3C, 0x42, 0x40, 0x40, 0x40, 0x42, 0x3C, 0x00],
        'D' => [0x78, 0x44, 0x42, 0x42, 0x42, 0x44, 0x78, 0x00],
        'E' => [0x7E, 0x40, 0x40, 0x7C, 0x40, 0x40, 0x7E, 0x00],
        'F' => [0x7E, 0x40, 0x40, 0x7C, 0x40, 0x40, 0x40, 0x00],
        'G' => [0x3C, 0x42, 0x40, 0x4E, 0x42, 0x42, 0x3C, 0x00],
        'H' => [0x42, 0x42, 0x42, 0x7E, 0x42, 0x42, 0x42, 0x00],
        'I' => [0x3E, 0x08, 0x08, 0x08, 0x08, 0x08, 0x3E, 0x00],
        'J' => [0x02, 0x02, 0x02, 0x02, 0x02, 0x42, 0x3C, 0x00],
        'K' => [0x44, 0x48, 0x50, 0x60, 0x50, 0x48, 0x44, 0x00],
        'L' => [0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x7E, 0x00],
        'M' => [0x42, 0x66, 0x5A, 0x42, 0x42, 0x42, 0x42, 0x00],
        'N' => [0x42, 0x62, 0x52, 0x4A, 0x46, 0x42, 0x42, 0x00],
        'O' => [0x3C, 0x42, 0x42, 0x42, 0x42, 0x42, 0x3C, 0x00],
        'P' => [0x7C, 0x42, 0x42, 0x7C, 0x40, 0x40, 0x40, 0x00],
        'Q' => [0x3C, 0x42, 0x42, 0x42, 0x4A, 0x44, 0x3A, 0x00],
        'R' => [0x7C, 0x42, 0x42, 0x7C, 0x48, 0x44, 0x42, 0x00],
        'S' => [0x3C, 0x42, 0x40, 0x3C, 0x02, 0x42, 0x3C, 0x00],
        'T' => [0x7F, 0x08, 0x08, 0x08, 0x08, 0x08, 0x08, 0x00],
        'U' => [0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x3C, 0x00],
        'V' => [0x42, 0x42, 0x42, 0x42, 0x24, 0x18, 0x18, 0x00],
        'W' => [0x42, 0x42, 0x42, 0x42, 0x5A, 0x66, 0x42, 0x00],
        'X' => [0x42, 0x24, 0x18, 0x18, 0x24, 0x42, 0x42, 0x00],
        'Y' => [0x41, 0x22, 0x14, 0x08, 0x08, 0x08, 0x08, 0x00],
        'Z' => [0x7E, 0x04, 0x08, 0x10, 0x20, 0x40, 0x7E, 0x00],
        '0' => [0x3C, 0x46, 0x4A, 0x52, 0x62, 0x62, 0x3C, 0x00],
        '1' => [0x18, 0x28, 0x08, 0x08, 0x08, 0x08, 0x3E, 0x00],
        '2' => [0x3C, 0x42, 0x02, 0x0C, 0x30, 0x40, 0x7E, 0x00],
        '3' => [0x3C, 0x42, 0x02, 0x1C, 0x02, 0x42, 0x3C, 0x00],
        '4' => [0x08, 0x18, 0x28, 0x48, 0x7E, 0x08, 0x08, 0x00],
        '5' => [0x7E, 0x40, 0x7C, 0x02, 0x02, 0x42, 0x3C, 0x00],
        '6' => [0x3C, 0x40, 0x40, 0x7C, 0x42, 0x42, 0x3C, 0x00],
        '7' => [0x7E, 0x02, 0x04, 0x08, 0x10, 0x20, 0x20, 0x00],
        '8' => [0x3C, 0x42, 0x42, 0x3C, 0x42, 0x42, 0x3C, 0x00],
        '9' => [0x3C, 0x42, 0x42, 0x3E, 0x02, 0x02, 0x3C, 0x00],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x18, 0x18, 0x00],
        ',' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x18, 0x18, 0x30],
        ':' => [0x00, 0x18, 0x18, 0x00, 0x00, 0x18, 0x18, 0x00],
        ';' => [0x00, 0x18, 0x18, 0x00, 0x00, 0x18, 0x18, 0x30],
        '!' => [0x18, 0x18, 0x18, 0x18, 0x00, 0x00, 0x18, 0x00],
        '?' => [0x3C, 0x42, 0x04, 0x08, 0x08, 0x00, 0x08, 0x00],
        '\'' => [0x18, 0x18, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00],
        '"' => [0x66, 0x66, 0x44, 0x00, 0x00, 0x00, 0x00, 0x00],
        '-' => [0x00, 0x00, 0x00, 0x7E, 0x00, 0x00, 0x00, 0x00],
        '&' => [0x30, 0x48, 0x50, 0x20, 0x54, 0x48, 0x34, 0x00],
        '(' => [0x0C, 0x10, 0x20, 0x20, 0x20, 0x10, 0x0C, 0x00],
        ')' => [0x30, 0x08, 0x04, 0x04, 0x04, 0x08, 0x30, 0x00],
        '/' => [0x02, 0x04, 0x08, 0x10, 0x20, 0x40, 0x00, 0x00],
        _ => return None,
    };
    Some(bitmap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_never_below_one() {
        assert_eq!(scale_for(4), 1);
        assert_eq!(scale_for(16), 2);
        assert_eq!(scale_for(40), 5);
    }

    #[test]
    fn test_reference_height_is_bottom_of_a() {
        // 'A' occupies rows 0..7 of its cell
        assert_eq!(reference_height(8), 7);
        assert_eq!(reference_height(16), 14);
    }

    #[test]
    fn test_rasterize_line_size_and_padding() {
        let mask = rasterize_line("AB", 16, 3).unwrap();
        assert_eq!(mask.width(), 2 * 16 + 6);
        assert_eq!(mask.height(), 16 + 6);
        assert_eq!(mask.origin(), (-3, -3));

        // Top row of 'A' is 0x18: columns 3 and 4, scaled by 2
        assert_eq!(mask.get(3 + 6, 3), 1.0);
        assert_eq!(mask.get(3 + 5, 3), 0.0);
    }

    #[test]
    fn test_lowercase_and_unknown_characters() {
        assert_eq!(rasterize_line("a", 8, 0), rasterize_line("A", 8, 0));
        assert!(rasterize_line("~", 8, 0).unwrap().is_empty());
    }

    #[test]
    fn test_oversized_line_is_refused() {
        assert!(rasterize_line("Title", 40, 40_000).is_none());
        assert!(rasterize_line("Title", u32::MAX, 0).is_none());
        assert!(rasterize_line("Title", 40, u32::MAX).is_none());
    }
}
