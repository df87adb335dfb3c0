/// An RGBA color, 8 bits per channel, not premultiplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xFF) as u8,
            g: ((hex >> 8) & 0xFF) as u8,
            b: (hex & 0xFF) as u8,
            a: 255,
        }
    }

    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn is_opaque(&self) -> bool {
        self.a == 255
    }

    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl From<[u8; 4]> for Color {
    fn from([r, g, b, a]: [u8; 4]) -> Self {
        Self { r, g, b, a }
    }
}

pub const GRAY_RAMP: u8 = 32;
pub const NUM_GRAY: u8 = 24;
pub const COLOR_CUBE: u8 = 56;
pub const NUM_RED: u8 = 5;
pub const NUM_GREEN: u8 = 8;
pub const NUM_BLUE: u8 = 5;

/// The 256-entry indexed colour map.
///
/// Entries 0..16 are the named colours, 32..56 a gray ramp and 56..256 a
/// 5x8x5 colour cube. Every entry can be redefined.
#[derive(Debug, Clone)]
pub struct Palette {
    entries: [Color; 256],
}

impl Palette {
    pub fn new() -> Self {
        const BASE: [u32; 16] = [
            0x000000, 0xff0000, 0x00ff00, 0xffff00, 0x0000ff, 0xff00ff, 0x00ffff, 0xffffff,
            0x555555, 0xc67171, 0x71c671, 0x8e8e38, 0x7171c6, 0x8e388e, 0x388e8e, 0xaaaaaa,
        ];
        let mut entries = [Color::BLACK; 256];
        for (entry, hex) in entries.iter_mut().zip(BASE) {
            *entry = Color::from_hex(hex);
        }
        // 16..32 are free slots, start them gray
        for entry in &mut entries[16..GRAY_RAMP as usize] {
            *entry = Color::rgb(0x80, 0x80, 0x80);
        }
        for i in 0..NUM_GRAY {
            let v = (i as u32 * 255 / (NUM_GRAY as u32 - 1)) as u8;
            entries[(GRAY_RAMP + i) as usize] = Color::rgb(v, v, v);
        }
        for b in 0..NUM_BLUE {
            for r in 0..NUM_RED {
                for g in 0..NUM_GREEN {
                    let index = Self::cube_index(r, g, b);
                    entries[index as usize] = Color::rgb(
                        Self::level(r, NUM_RED),
                        Self::level(g, NUM_GREEN),
                        Self::level(b, NUM_BLUE),
                    );
                }
            }
        }
        Self { entries }
    }

    fn level(step: u8, steps: u8) -> u8 {
        (step as u32 * 255 / (steps as u32 - 1)) as u8
    }

    fn cube_index(r: u8, g: u8, b: u8) -> u8 {
        (b * NUM_RED + r) * NUM_GREEN + g + COLOR_CUBE
    }

    pub fn get(&self, index: u8) -> Color {
        self.entries[index as usize]
    }

    pub fn set(&mut self, index: u8, color: Color) {
        self.entries[index as usize] = color;
    }

    /// Index of the colour-cube entry closest to `color`.
    pub fn nearest_cube_index(color: Color) -> u8 {
        let quantize = |v: u8, steps: u8| -> u8 {
            ((v as u32 * (steps as u32 - 1) + 127) / 255) as u8
        };
        Self::cube_index(
            quantize(color.r, NUM_RED),
            quantize(color.g, NUM_GREEN),
            quantize(color.b, NUM_BLUE),
        )
    }

    /// Gray ramp entry for `level` in 0..=255.
    pub fn gray_index(level: u8) -> u8 {
        GRAY_RAMP + ((level as u32 * (NUM_GRAY as u32 - 1) + 127) / 255) as u8
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}
