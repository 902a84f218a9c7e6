//! SSD anchors for the 192x192 MediaPipe palm detector.

// Consecutive layers sharing a stride share one feature map.
const STRIDES: [u32; 4] = [8, 16, 16, 16];
// One square anchor plus one interpolated-scale anchor per layer and cell.
const ANCHORS_PER_LAYER: usize = 2;

pub const NUM_ANCHORS: usize = 2016;

/// Anchor centers `[cx, cy]` normalized to the model input, in output order.
pub fn generate_anchors(input_size: u32) -> Vec<[f32; 2]> {
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);
    let mut layer = 0;

    while layer < STRIDES.len() {
        let stride = STRIDES[layer];
        let mut repeats = 0;
        while layer < STRIDES.len() && STRIDES[layer] == stride {
            repeats += 1;
            layer += 1;
        }

        let grid = input_size.div_ceil(stride);
        for y in 0..grid {
            for x in 0..grid {
                let center = [
                    (x as f32 + 0.5) / grid as f32,
                    (y as f32 + 0.5) / grid as f32,
                ];
                anchors.extend(std::iter::repeat_n(center, repeats * ANCHORS_PER_LAYER));
            }
        }
    }

    anchors
}
