use crate::braille::BrailleCanvas;

/// Draw a line using Bresenham's algorithm.
pub fn draw_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let (mut x, mut y) = (x0, y0);
    loop {
        canvas.set_pixel_signed(x, y);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Draw an axis-aligned rectangle outline.
pub fn draw_rect(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32) {
    draw_line(canvas, x0, y0, x1, y0);
    draw_line(canvas, x1, y0, x1, y1);
    draw_line(canvas, x1, y1, x0, y1);
    draw_line(canvas, x0, y1, x0, y0);
}

/// Draw a filled circle (point markers).
pub fn draw_circle(canvas: &mut BrailleCanvas, cx: i32, cy: i32, radius: i32) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                canvas.set_pixel_signed(cx + dx, cy + dy);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit_cells(canvas: &BrailleCanvas) -> usize {
        canvas
            .rows()
            .map(|row| row.chars().filter(|&c| c != '\u{2800}').count())
            .sum()
    }

    #[test]
    fn horizontal_line_covers_cells() {
        let mut canvas = BrailleCanvas::new(5, 1);
        draw_line(&mut canvas, 0, 0, 9, 0);
        assert_eq!(lit_cells(&canvas), 5);
    }

    #[test]
    fn rect_outline_leaves_interior_empty() {
        let mut canvas = BrailleCanvas::new(8, 4);
        draw_rect(&mut canvas, 0, 0, 15, 15);
        // Interior cells (not touching the outline) stay blank.
        let middle = canvas.row_to_string(1);
        assert_eq!(middle.chars().nth(3), Some('\u{2800}'));
        assert!(lit_cells(&canvas) > 0);
    }

    #[test]
    fn circle_radius_zero_is_single_pixel() {
        let mut canvas = BrailleCanvas::new(2, 1);
        draw_circle(&mut canvas, 0, 0, 0);
        assert_eq!(lit_cells(&canvas), 1);
    }
}
