/// Dash pattern of stroked lines.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Dash {
    #[default]
    Solid,
    Dash,
    Dot,
    DashDot,
    DashDotDot,
    /// Alternating on/off lengths in pixels, starting with "on".
    /// Zero entries end the pattern.
    Custom(Vec<u8>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
    #[default]
    Flat,
    Round,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

/// Stroke parameters for lines, loops and outlines.
///
/// A width of 0 means the thinnest line the backend can draw.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineStyle {
    pub dash: Dash,
    pub width: u32,
    pub cap: LineCap,
    pub join: LineJoin,
}

impl LineStyle {
    pub fn solid() -> Self {
        Self::default()
    }

    pub fn width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    pub fn dash(mut self, dash: Dash) -> Self {
        self.dash = dash;
        self
    }

    pub fn cap(mut self, cap: LineCap) -> Self {
        self.cap = cap;
        self
    }

    pub fn join(mut self, join: LineJoin) -> Self {
        self.join = join;
        self
    }

    /// Width in device pixels, never below one.
    pub fn effective_width(&self) -> u32 {
        self.width.max(1)
    }

    /// The on/off run lengths in pixels, scaled by the line width.
    /// Empty for solid lines.
    pub fn dash_pattern(&self) -> Vec<u32> {
        let w = self.effective_width();
        let base: &[u32] = match &self.dash {
            Dash::Solid => return Vec::new(),
            Dash::Dash => &[3, 1],
            Dash::Dot => &[1, 1],
            Dash::DashDot => &[3, 1, 1, 1],
            Dash::DashDotDot => &[3, 1, 1, 1, 1, 1],
            Dash::Custom(lengths) => {
                let pattern: Vec<u32> = lengths
                    .iter()
                    .take_while(|&&l| l != 0)
                    .map(|&l| l as u32)
                    .collect();
                // an odd-length pattern repeats with on/off swapped
                return if pattern.len() % 2 == 1 {
                    pattern.iter().chain(pattern.iter()).copied().collect()
                } else {
                    pattern
                };
            }
        };
        base.iter().map(|l| l * w).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_has_no_pattern() {
        assert!(LineStyle::solid().dash_pattern().is_empty());
        assert_eq!(LineStyle::solid().effective_width(), 1);
    }

    #[test]
    fn test_patterns_scale_with_width() {
        let style = LineStyle::solid().dash(Dash::DashDot).width(2);
        assert_eq!(style.dash_pattern(), vec![6, 2, 2, 2]);
    }

    #[test]
    fn test_custom_pattern_stops_at_zero() {
        let style = LineStyle::solid().dash(Dash::Custom(vec![4, 2, 0, 9]));
        assert_eq!(style.dash_pattern(), vec![4, 2]);
        let odd = LineStyle::solid().dash(Dash::Custom(vec![5]));
        assert_eq!(odd.dash_pattern(), vec![5, 5]);
    }
}
