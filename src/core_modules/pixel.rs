// THEORY:
// The `Pixel` module is the most fundamental building block of the blending
// engine. It is a "dumb" data container: it represents the raw RGBA data of a
// single pixel and knows how to compute properties from its own channels, and
// nothing else.
//
// Key architectural principles:
// 1.  **Data Purity**: It holds the raw `u8` channel values without any
//     interpretation. Relationships between pixels (blend ratios, local
//     statistics) belong to higher modules.
// 2.  **Intrinsic Knowledge**: `luminance` is the single-pixel heuristic the
//     whole engine is built on - the perceived brightness of the pixel in
//     [0, 1], computed from gamma-encoded sRGB channels.
// 3.  **Arithmetic Domain**: `wide` lifts the 8-bit channels into the 16-bit
//     color domain. The channel-combination formula in the blender truncates
//     with `>> 8` and is only exact in that domain.

pub mod pixel {
    use image::Rgba;

    pub type Byte = u8;
    pub type Channel = Byte;
    /// A channel widened into the 16-bit color domain (0-65535).
    pub type WideChannel = u32;
    /// Perceived brightness in [0, 1].
    pub type Luminance = f64;

    const CHANNEL_MAX: f64 = 255.0;

    /// A "dumb" data container representing a single RGBA pixel.
    #[derive(Debug, Clone, PartialEq)]
    pub struct Pixel {
        /// The red channel value (0-255).
        pub red: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The blue channel value (0-255).
        pub blue: Channel,
        /// The alpha (transparency) channel value (0-255).
        pub alpha: Channel,
    }

    impl Default for Pixel {
        fn default() -> Self {
            Pixel::new(0, 0, 0, 0)
        }
    }

    impl Pixel {
        pub fn new(red: Channel, green: Channel, blue: Channel, alpha: Channel) -> Self {
            Pixel {
                red,
                green,
                blue,
                alpha,
            }
        }

        /// The perceived brightness of this pixel, in [0, 1].
        ///
        /// `sqrt(0.299*R^2 + 0.587*G^2 + 0.114*B^2)` with the channels
        /// normalized to [0, 1]. Black maps to 0.0, white to 1.0.
        pub fn luminance(&self) -> Luminance {
            let red_normalized = self.red as f64 / CHANNEL_MAX;
            let green_normalized = self.green as f64 / CHANNEL_MAX;
            let blue_normalized = self.blue as f64 / CHANNEL_MAX;

            let red_component = 0.299 * red_normalized.powi(2);
            let green_component = 0.587 * green_normalized.powi(2);
            let blue_component = 0.114 * blue_normalized.powi(2);
            (red_component + green_component + blue_component).sqrt()
        }

        /// The channels widened into the 16-bit color domain, in RGBA order.
        /// A byte `c` becomes `c * 0x101`, so 255 widens to 65535.
        pub fn wide(&self) -> [WideChannel; 4] {
            [
                self.red as WideChannel * 0x101,
                self.green as WideChannel * 0x101,
                self.blue as WideChannel * 0x101,
                self.alpha as WideChannel * 0x101,
            ]
        }

        /// The raw channel bytes in RGBA order.
        pub fn bytes(&self) -> [Byte; 4] {
            [self.red, self.green, self.blue, self.alpha]
        }
    }

    impl From<Rgba<u8>> for Pixel {
        fn from(rgba: Rgba<u8>) -> Self {
            let [red, green, blue, alpha] = rgba.0;
            Pixel::new(red, green, blue, alpha)
        }
    }
}
