// The fixed catalogue of view modes, selectable by button or digit key.

pub const MODE_COUNT: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    Grayscale,
    SobelX,
    SobelY,
    Blur,
    OpticalFlow,
    Edges,
    Laplacian,
    Threshold,
    GradientMagnitude,
    ColorMask,
    /// Raw color frame; what every id outside 0..=9 resolves to.
    Passthrough,
}

impl Mode {
    /// Catalogue order; index == mode id.
    pub const ALL: [Mode; MODE_COUNT] = [
        Mode::Grayscale,
        Mode::SobelX,
        Mode::SobelY,
        Mode::Blur,
        Mode::OpticalFlow,
        Mode::Edges,
        Mode::Laplacian,
        Mode::Threshold,
        Mode::GradientMagnitude,
        Mode::ColorMask,
    ];

    /// Any id outside 0..=9 is passthrough.
    pub fn from_id(id: i32) -> Mode {
        usize::try_from(id)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .unwrap_or(Mode::Passthrough)
    }

    /// `None` for passthrough, which has no button.
    pub fn id(self) -> Option<i32> {
        Self::ALL.iter().position(|&m| m == self).map(|i| i as i32)
    }

    /// Text painted on the mode's button.
    pub fn label(self) -> &'static str {
        match self {
            Mode::Grayscale => "Grayscale",
            Mode::SobelX => "Sobel X",
            Mode::SobelY => "Sobel Y",
            Mode::Blur => "Blur",
            Mode::OpticalFlow => "Optical Flow",
            Mode::Edges => "Canny",
            Mode::Laplacian => "Laplacian",
            Mode::Threshold => "Threshold",
            Mode::GradientMagnitude => "Sobel Mag",
            Mode::ColorMask => "Blue Mask",
            Mode::Passthrough => "Live",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_map_onto_catalogue() {
        for (i, m) in Mode::ALL.iter().enumerate() {
            assert_eq!(Mode::from_id(i as i32), *m);
            assert_eq!(m.id(), Some(i as i32));
        }
        assert_eq!(Mode::from_id(4), Mode::OpticalFlow);
    }

    #[test]
    fn out_of_range_ids_are_passthrough() {
        assert_eq!(Mode::from_id(-1), Mode::Passthrough);
        assert_eq!(Mode::from_id(10), Mode::Passthrough);
        assert_eq!(Mode::from_id(i32::MAX), Mode::Passthrough);
        assert_eq!(Mode::Passthrough.id(), None);
    }
}
