use crate::RenderError;

/// Glyph cells are treated as twice as tall as they are wide.
pub const CELL_HEIGHT_RATIO: f64 = 2.0;

/// Text size relative to the cell width when drawing on a canvas.
pub const DEFAULT_FONT_SCALE: f64 = 2.1;

/// Character grid laid over an output region.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridGeometry {
    pub columns: u32,
    pub rows: u32,
    pub out_width: f64,
    pub out_height: f64,
}

impl GridGeometry {
    /// Derive the grid for `columns` cells across an `out_width x out_height` region.
    ///
    /// `rows = floor(columns * out_height / out_width / 2)`, which may be zero.
    pub fn derive(columns: u32, out_width: f64, out_height: f64) -> Result<Self, RenderError> {
        if columns == 0 {
            return Err(RenderError::InvalidConfig("column count must be positive".into()));
        }
        ensure_positive("output width", out_width)?;
        ensure_positive("output height", out_height)?;

        let rows = (f64::from(columns) * out_height / out_width / CELL_HEIGHT_RATIO).floor();
        let rows = rows.min(f64::from(u32::MAX)) as u32;

        Ok(Self { columns, rows, out_width, out_height })
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn cell_width(&self) -> f64 {
        self.out_width / f64::from(self.columns)
    }

    pub fn cell_height(&self) -> f64 {
        if self.rows == 0 {
            return 0.0;
        }
        self.out_height / f64::from(self.rows)
    }

    pub fn font_size(&self, font_scale: f64) -> f64 {
        self.cell_width() * font_scale
    }

    /// Top-left corner of cell `(column, row)` relative to the region.
    pub fn cell_origin(&self, column: u32, row: u32) -> (f64, f64) {
        (f64::from(column) * self.cell_width(), f64::from(row) * self.cell_height())
    }

    /// Source pixel sampled for cell `(column, row)` of a `width x height` image.
    pub fn source_pixel(&self, column: u32, row: u32, width: u32, height: u32) -> (u32, u32) {
        let x = scale_index(column, self.columns, width);
        let y = scale_index(row, self.rows, height);
        (x, y)
    }
}

fn scale_index(index: u32, count: u32, extent: u32) -> u32 {
    let mapped = (f64::from(index) / f64::from(count) * f64::from(extent)).floor();
    (mapped.max(0.0) as u32).min(extent.saturating_sub(1))
}

/// Placement of an image inside a container.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitRect {
    pub x_offset: f64,
    pub y_offset: f64,
    pub width: f64,
    pub height: f64,
}

impl FitRect {
    /// Rectangle covering a whole `width x height` surface.
    pub fn full(width: f64, height: f64) -> Self {
        Self { x_offset: 0.0, y_offset: 0.0, width, height }
    }
}

/// Largest rectangle with the source's aspect ratio that fits in the container, centered.
pub fn aspect_fit(
    source_width: u32,
    source_height: u32,
    container_width: f64,
    container_height: f64,
) -> Result<FitRect, RenderError> {
    if source_width == 0 || source_height == 0 {
        return Err(RenderError::InvalidBuffer { width: source_width, height: source_height });
    }
    ensure_positive("container width", container_width)?;
    ensure_positive("container height", container_height)?;

    let source_width = f64::from(source_width);
    let source_height = f64::from(source_height);

    let (width, height) = if source_width > source_height {
        let width = container_width;
        let height = width * source_height / source_width;
        if height > container_height {
            (container_height * source_width / source_height, container_height)
        } else {
            (width, height)
        }
    } else {
        let height = container_height;
        let width = height * source_width / source_height;
        if width > container_width {
            (container_width, container_width * source_height / source_width)
        } else {
            (width, height)
        }
    };

    Ok(FitRect {
        x_offset: (container_width - width) / 2.0,
        y_offset: (container_height - height) / 2.0,
        width,
        height,
    })
}

fn ensure_positive(what: &str, value: f64) -> Result<(), RenderError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(RenderError::InvalidConfig(format!("{what} must be positive, got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_follow_half_height_cells() {
        let geometry = GridGeometry::derive(150, 1000.0, 500.0).unwrap();
        assert_eq!(geometry.rows, 37);

        let square = GridGeometry::derive(150, 1024.0, 1024.0).unwrap();
        assert_eq!(square.rows, 75);
        assert_eq!(square.cell_width(), 1024.0 / 150.0);
        assert!((square.font_size(DEFAULT_FONT_SCALE) - 1024.0 / 150.0 * 2.1).abs() < 1e-9);
    }

    #[test]
    fn wide_regions_collapse_to_zero_rows() {
        let geometry = GridGeometry::derive(4, 1000.0, 10.0).unwrap();
        assert_eq!(geometry.rows, 0);
        assert!(geometry.is_empty());
        assert_eq!(geometry.cell_height(), 0.0);
    }

    #[test]
    fn invalid_parameters_are_config_errors() {
        assert!(matches!(GridGeometry::derive(0, 10.0, 10.0), Err(RenderError::InvalidConfig(_))));
        assert!(matches!(GridGeometry::derive(10, 0.0, 10.0), Err(RenderError::InvalidConfig(_))));
        assert!(matches!(
            GridGeometry::derive(10, 10.0, -1.0),
            Err(RenderError::InvalidConfig(_))
        ));
        assert!(GridGeometry::derive(10, f64::NAN, 10.0).is_err());
    }

    #[test]
    fn source_pixels_stay_in_bounds() {
        let geometry = GridGeometry::derive(150, 100.0, 400.0).unwrap();
        assert_eq!(geometry.rows, 300);
        assert_eq!(geometry.source_pixel(0, 0, 3, 3), (0, 0));
        assert_eq!(geometry.source_pixel(149, 299, 3, 3), (2, 2));
        assert_eq!(geometry.source_pixel(75, 150, 3, 3), (1, 1));
    }

    #[test]
    fn cell_origins_step_by_cell_size() {
        let geometry = GridGeometry::derive(10, 100.0, 100.0).unwrap();
        assert_eq!(geometry.rows, 5);
        assert_eq!(geometry.cell_origin(3, 2), (30.0, 40.0));
    }

    #[test]
    fn landscape_fits_width_first() {
        let rect = aspect_fit(200, 100, 100.0, 100.0).unwrap();
        assert_eq!(rect, FitRect { x_offset: 0.0, y_offset: 25.0, width: 100.0, height: 50.0 });
    }

    #[test]
    fn landscape_shrinks_to_height() {
        let rect = aspect_fit(200, 100, 400.0, 100.0).unwrap();
        assert_eq!(rect, FitRect { x_offset: 100.0, y_offset: 0.0, width: 200.0, height: 100.0 });
    }

    #[test]
    fn portrait_fits_height_first() {
        let rect = aspect_fit(100, 200, 100.0, 100.0).unwrap();
        assert_eq!(rect, FitRect { x_offset: 25.0, y_offset: 0.0, width: 50.0, height: 100.0 });

        let rect = aspect_fit(100, 200, 50.0, 400.0).unwrap();
        assert_eq!(rect, FitRect { x_offset: 0.0, y_offset: 150.0, width: 50.0, height: 100.0 });
    }

    #[test]
    fn square_sources_fill_square_containers() {
        let rect = aspect_fit(64, 64, 300.0, 300.0).unwrap();
        assert_eq!(rect, FitRect::full(300.0, 300.0));
    }
}
