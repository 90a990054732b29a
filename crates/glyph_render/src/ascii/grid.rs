use crate::geometry::{FitRect, GridGeometry};

/// Row-major grid of selected glyphs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlyphGrid {
    pub width: u32,
    pub height: u32,
    pub cells: Vec<char>,
}

impl GlyphGrid {
    pub fn new(width: u32, height: u32, cells: Vec<char>) -> Self {
        assert_eq!(width as usize * height as usize, cells.len());
        Self { width, height, cells }
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, column: u32, row: u32) -> Option<char> {
        if column >= self.width || row >= self.height {
            return None;
        }
        self.cells.get(row as usize * self.width as usize + column as usize).copied()
    }

    /// One string per grid row; rows are empty when the grid has no columns.
    pub fn rows(&self) -> impl Iterator<Item = String> + '_ {
        let width = self.width as usize;
        (0..self.height as usize)
            .map(move |row| self.cells[row * width..(row + 1) * width].iter().collect::<String>())
    }

    /// All rows, each followed by a line break.
    pub fn to_text(&self) -> String {
        let mut text = String::with_capacity(self.cells.len() + self.height as usize);
        for row in self.rows() {
            text.push_str(&row);
            text.push('\n');
        }
        text
    }
}

/// One glyph to draw at a pixel position with a given text size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawInstruction {
    pub glyph: char,
    pub x: f64,
    pub y: f64,
    pub font_size: f64,
}

/// Grid destined for a canvas, along with where its cells land.
#[derive(Clone, Debug, PartialEq)]
pub struct CanvasArt {
    pub grid: GlyphGrid,
    pub geometry: GridGeometry,
    /// Region of the canvas covered by the grid.
    pub region: FitRect,
    pub font_scale: f64,
}

impl CanvasArt {
    pub fn font_size(&self) -> f64 {
        self.geometry.font_size(self.font_scale)
    }

    /// Draw calls in row-major order, offset by the region origin.
    pub fn instructions(&self) -> impl Iterator<Item = DrawInstruction> + '_ {
        let font_size = self.font_size();
        let width = self.grid.width;
        self.grid.cells.iter().enumerate().map(move |(index, &glyph)| {
            let column = index as u32 % width;
            let row = index as u32 / width;
            let (x, y) = self.geometry.cell_origin(column, row);
            DrawInstruction {
                glyph,
                x: self.region.x_offset + x,
                y: self.region.y_offset + y,
                font_size,
            }
        })
    }
}

/// Result of one rasterization pass.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderedArt {
    /// Monospace text block.
    Text(GlyphGrid),
    /// Draw calls for a canvas.
    Canvas(CanvasArt),
}

impl RenderedArt {
    pub fn grid(&self) -> &GlyphGrid {
        match self {
            RenderedArt::Text(grid) => grid,
            RenderedArt::Canvas(art) => &art.grid,
        }
    }

    pub fn to_text(&self) -> String {
        self.grid().to_text()
    }

    pub fn instructions(&self) -> Vec<DrawInstruction> {
        match self {
            RenderedArt::Text(_) => Vec::new(),
            RenderedArt::Canvas(art) => art.instructions().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_has_one_line_per_row() {
        let grid = GlyphGrid::new(3, 2, "ab cd ".chars().collect());
        assert_eq!(grid.rows().collect::<Vec<_>>(), vec!["ab ", "cd "]);
        assert_eq!(grid.to_text(), "ab \ncd \n");
        assert_eq!(grid.get(1, 1), Some('d'));
        assert_eq!(grid.get(3, 0), None);
    }

    #[test]
    fn empty_grid_renders_nothing() {
        let grid = GlyphGrid::new(150, 0, Vec::new());
        assert!(grid.is_empty());
        assert_eq!(grid.rows().count(), 0);
        assert_eq!(grid.to_text(), "");
    }

    #[test]
    fn zero_width_grid_keeps_its_rows() {
        let grid = GlyphGrid::new(0, 3, Vec::new());
        assert_eq!(grid.rows().collect::<Vec<_>>(), vec!["", "", ""]);
        assert_eq!(grid.to_text(), "\n\n\n");
    }

    #[test]
    fn instructions_are_offset_by_region() {
        let geometry = GridGeometry::derive(2, 20.0, 40.0).unwrap();
        let art = CanvasArt {
            grid: GlyphGrid::new(2, 2, vec!['a', 'b', 'c', 'd']),
            geometry,
            region: FitRect { x_offset: 5.0, y_offset: 7.0, width: 20.0, height: 40.0 },
            font_scale: 2.0,
        };

        let instructions: Vec<_> = art.instructions().collect();
        assert_eq!(instructions.len(), 4);
        assert_eq!(
            instructions[3],
            DrawInstruction { glyph: 'd', x: 15.0, y: 27.0, font_size: 20.0 }
        );
        assert_eq!(RenderedArt::Canvas(art).instructions().len(), 4);
    }
}
