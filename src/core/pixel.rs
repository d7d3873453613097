use num_traits::{Bounded, NumCast, ToPrimitive};

/// Raster sample type that can round-trip through `f64` for interpolation.
///
/// Integer types round to nearest and saturate at their bounds; float types
/// pass through.
pub trait Pixel: Copy + Default + Send + Sync + ToPrimitive + 'static {
    fn from_f64(v: f64) -> Self;

    fn as_f64(self) -> f64 {
        self.to_f64().unwrap_or(f64::NAN)
    }
}

fn saturating_cast<T: NumCast + Bounded + Default>(v: f64) -> T {
    if v.is_nan() {
        return T::default();
    }
    let rounded = v.round();
    NumCast::from(rounded).unwrap_or_else(|| {
        if rounded < 0.0 {
            T::min_value()
        } else {
            T::max_value()
        }
    })
}

macro_rules! int_pixel {
    ($($t:ty),*) => {
        $(impl Pixel for $t {
            fn from_f64(v: f64) -> Self {
                saturating_cast::<$t>(v)
            }
        })*
    };
}

int_pixel!(u8, u16, i16, u32, i32);

impl Pixel for f32 {
    fn from_f64(v: f64) -> Self {
        v as f32
    }
}

impl Pixel for f64 {
    fn from_f64(v: f64) -> Self {
        v
    }
}
