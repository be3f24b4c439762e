//! Nearest CSS3 colour name for a hex colour, memoised per resolver.

use crate::scraper::error::ScraperError;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// CSS3 named colours, one name per distinct RGB value, in lookup order.
///
/// Synonyms are collapsed: `#00ffff` is "cyan", `#ff00ff` is "magenta", and the
/// "gray" spelling is used for every gray/grey pair.
const CSS3_COLORS: &[([u8; 3], &str)] = &[
    ([0xf0, 0xf8, 0xff], "aliceblue"),
    ([0xfa, 0xeb, 0xd7], "antiquewhite"),
    ([0x00, 0xff, 0xff], "cyan"),
    ([0x7f, 0xff, 0xd4], "aquamarine"),
    ([0xf0, 0xff, 0xff], "azure"),
    ([0xf5, 0xf5, 0xdc], "beige"),
    ([0xff, 0xe4, 0xc4], "bisque"),
    ([0x00, 0x00, 0x00], "black"),
    ([0xff, 0xeb, 0xcd], "blanchedalmond"),
    ([0x00, 0x00, 0xff], "blue"),
    ([0x8a, 0x2b, 0xe2], "blueviolet"),
    ([0xa5, 0x2a, 0x2a], "brown"),
    ([0xde, 0xb8, 0x87], "burlywood"),
    ([0x5f, 0x9e, 0xa0], "cadetblue"),
    ([0x7f, 0xff, 0x00], "chartreuse"),
    ([0xd2, 0x69, 0x1e], "chocolate"),
    ([0xff, 0x7f, 0x50], "coral"),
    ([0x64, 0x95, 0xed], "cornflowerblue"),
    ([0xff, 0xf8, 0xdc], "cornsilk"),
    ([0xdc, 0x14, 0x3c], "crimson"),
    ([0x00, 0x00, 0x8b], "darkblue"),
    ([0x00, 0x8b, 0x8b], "darkcyan"),
    ([0xb8, 0x86, 0x0b], "darkgoldenrod"),
    ([0xa9, 0xa9, 0xa9], "darkgray"),
    ([0x00, 0x64, 0x00], "darkgreen"),
    ([0xbd, 0xb7, 0x6b], "darkkhaki"),
    ([0x8b, 0x00, 0x8b], "darkmagenta"),
    ([0x55, 0x6b, 0x2f], "darkolivegreen"),
    ([0xff, 0x8c, 0x00], "darkorange"),
    ([0x99, 0x32, 0xcc], "darkorchid"),
    ([0x8b, 0x00, 0x00], "darkred"),
    ([0xe9, 0x96, 0x7a], "darksalmon"),
    ([0x8f, 0xbc, 0x8f], "darkseagreen"),
    ([0x48, 0x3d, 0x8b], "darkslateblue"),
    ([0x2f, 0x4f, 0x4f], "darkslategray"),
    ([0x00, 0xce, 0xd1], "darkturquoise"),
    ([0x94, 0x00, 0xd3], "darkviolet"),
    ([0xff, 0x14, 0x93], "deeppink"),
    ([0x00, 0xbf, 0xff], "deepskyblue"),
    ([0x69, 0x69, 0x69], "dimgray"),
    ([0x1e, 0x90, 0xff], "dodgerblue"),
    ([0xb2, 0x22, 0x22], "firebrick"),
    ([0xff, 0xfa, 0xf0], "floralwhite"),
    ([0x22, 0x8b, 0x22], "forestgreen"),
    ([0xff, 0x00, 0xff], "magenta"),
    ([0xdc, 0xdc, 0xdc], "gainsboro"),
    ([0xf8, 0xf8, 0xff], "ghostwhite"),
    ([0xff, 0xd7, 0x00], "gold"),
    ([0xda, 0xa5, 0x20], "goldenrod"),
    ([0x80, 0x80, 0x80], "gray"),
    ([0x00, 0x80, 0x00], "green"),
    ([0xad, 0xff, 0x2f], "greenyellow"),
    ([0xf0, 0xff, 0xf0], "honeydew"),
    ([0xff, 0x69, 0xb4], "hotpink"),
    ([0xcd, 0x5c, 0x5c], "indianred"),
    ([0x4b, 0x00, 0x82], "indigo"),
    ([0xff, 0xff, 0xf0], "ivory"),
    ([0xf0, 0xe6, 0x8c], "khaki"),
    ([0xe6, 0xe6, 0xfa], "lavender"),
    ([0xff, 0xf0, 0xf5], "lavenderblush"),
    ([0x7c, 0xfc, 0x00], "lawngreen"),
    ([0xff, 0xfa, 0xcd], "lemonchiffon"),
    ([0xad, 0xd8, 0xe6], "lightblue"),
    ([0xf0, 0x80, 0x80], "lightcoral"),
    ([0xe0, 0xff, 0xff], "lightcyan"),
    ([0xfa, 0xfa, 0xd2], "lightgoldenrodyellow"),
    ([0xd3, 0xd3, 0xd3], "lightgray"),
    ([0x90, 0xee, 0x90], "lightgreen"),
    ([0xff, 0xb6, 0xc1], "lightpink"),
    ([0xff, 0xa0, 0x7a], "lightsalmon"),
    ([0x20, 0xb2, 0xaa], "lightseagreen"),
    ([0x87, 0xce, 0xfa], "lightskyblue"),
    ([0x77, 0x88, 0x99], "lightslategray"),
    ([0xb0, 0xc4, 0xde], "lightsteelblue"),
    ([0xff, 0xff, 0xe0], "lightyellow"),
    ([0x00, 0xff, 0x00], "lime"),
    ([0x32, 0xcd, 0x32], "limegreen"),
    ([0xfa, 0xf0, 0xe6], "linen"),
    ([0x80, 0x00, 0x00], "maroon"),
    ([0x66, 0xcd, 0xaa], "mediumaquamarine"),
    ([0x00, 0x00, 0xcd], "mediumblue"),
    ([0xba, 0x55, 0xd3], "mediumorchid"),
    ([0x93, 0x70, 0xdb], "mediumpurple"),
    ([0x3c, 0xb3, 0x71], "mediumseagreen"),
    ([0x7b, 0x68, 0xee], "mediumslateblue"),
    ([0x00, 0xfa, 0x9a], "mediumspringgreen"),
    ([0x48, 0xd1, 0xcc], "mediumturquoise"),
    ([0xc7, 0x15, 0x85], "mediumvioletred"),
    ([0x19, 0x19, 0x70], "midnightblue"),
    ([0xf5, 0xff, 0xfa], "mintcream"),
    ([0xff, 0xe4, 0xe1], "mistyrose"),
    ([0xff, 0xe4, 0xb5], "moccasin"),
    ([0xff, 0xde, 0xad], "navajowhite"),
    ([0x00, 0x00, 0x80], "navy"),
    ([0xfd, 0xf5, 0xe6], "oldlace"),
    ([0x80, 0x80, 0x00], "olive"),
    ([0x6b, 0x8e, 0x23], "olivedrab"),
    ([0xff, 0xa5, 0x00], "orange"),
    ([0xff, 0x45, 0x00], "orangered"),
    ([0xda, 0x70, 0xd6], "orchid"),
    ([0xee, 0xe8, 0xaa], "palegoldenrod"),
    ([0x98, 0xfb, 0x98], "palegreen"),
    ([0xaf, 0xee, 0xee], "paleturquoise"),
    ([0xdb, 0x70, 0x93], "palevioletred"),
    ([0xff, 0xef, 0xd5], "papayawhip"),
    ([0xff, 0xda, 0xb9], "peachpuff"),
    ([0xcd, 0x85, 0x3f], "peru"),
    ([0xff, 0xc0, 0xcb], "pink"),
    ([0xdd, 0xa0, 0xdd], "plum"),
    ([0xb0, 0xe0, 0xe6], "powderblue"),
    ([0x80, 0x00, 0x80], "purple"),
    ([0xff, 0x00, 0x00], "red"),
    ([0xbc, 0x8f, 0x8f], "rosybrown"),
    ([0x41, 0x69, 0xe1], "royalblue"),
    ([0x8b, 0x45, 0x13], "saddlebrown"),
    ([0xfa, 0x80, 0x72], "salmon"),
    ([0xf4, 0xa4, 0x60], "sandybrown"),
    ([0x2e, 0x8b, 0x57], "seagreen"),
    ([0xff, 0xf5, 0xee], "seashell"),
    ([0xa0, 0x52, 0x2d], "sienna"),
    ([0xc0, 0xc0, 0xc0], "silver"),
    ([0x87, 0xce, 0xeb], "skyblue"),
    ([0x6a, 0x5a, 0xcd], "slateblue"),
    ([0x70, 0x80, 0x90], "slategray"),
    ([0xff, 0xfa, 0xfa], "snow"),
    ([0x00, 0xff, 0x7f], "springgreen"),
    ([0x46, 0x82, 0xb4], "steelblue"),
    ([0xd2, 0xb4, 0x8c], "tan"),
    ([0x00, 0x80, 0x80], "teal"),
    ([0xd8, 0xbf, 0xd8], "thistle"),
    ([0xff, 0x63, 0x47], "tomato"),
    ([0x40, 0xe0, 0xd0], "turquoise"),
    ([0xee, 0x82, 0xee], "violet"),
    ([0xf5, 0xde, 0xb3], "wheat"),
    ([0xff, 0xff, 0xff], "white"),
    ([0xf5, 0xf5, 0xf5], "whitesmoke"),
    ([0xff, 0xff, 0x00], "yellow"),
    ([0x9a, 0xcd, 0x32], "yellowgreen"),
];

/// Parse `#rgb` or `#rrggbb` (any case) into an RGB triplet.
pub fn hex_to_rgb(value: &str) -> Result<[u8; 3], ScraperError> {
    let invalid = || ScraperError::InvalidColor {
        value: value.to_string(),
    };
    let digits = value.strip_prefix('#').ok_or_else(invalid)?;
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_string(),
        _ => return Err(invalid()),
    };
    let mut rgb = [0u8; 3];
    for (i, channel) in rgb.iter_mut().enumerate() {
        *channel = u8::from_str_radix(&expanded[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
    }
    Ok(rgb)
}

/// Name of the CSS3 colour nearest to `rgb` by squared RGB distance.
/// On a tie the entry that comes later in the table wins.
pub fn nearest_css3_name(rgb: [u8; 3]) -> &'static str {
    let distance = |c: &[u8; 3]| -> u32 {
        c.iter()
            .zip(rgb.iter())
            .map(|(&a, &b)| {
                let d = i32::from(a) - i32::from(b);
                (d * d) as u32
            })
            .sum()
    };
    let mut best = ("", u32::MAX);
    for (color, name) in CSS3_COLORS {
        let d = distance(color);
        if d <= best.1 {
            best = (*name, d);
        }
    }
    best.0
}

/// Memoised hex -> colour-name lookup.
///
/// Keys are the hex strings exactly as they appear in the page; `#FF0000` and
/// `#ff0000` are cached separately. The cache is never evicted.
#[derive(Debug, Default)]
pub struct ColorResolver {
    cache: Mutex<HashMap<String, &'static str>>,
}

impl ColorResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `hex` to the nearest CSS3 colour name.
    pub fn resolve(&self, hex: &str) -> Result<&'static str, ScraperError> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(name) = cache.get(hex) {
            return Ok(*name);
        }
        let name = nearest_css3_name(hex_to_rgb(hex)?);
        cache.insert(hex.to_string(), name);
        Ok(name)
    }

    /// Number of cached lookups.
    pub fn len(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
