use crate::window::ContextWindow;
use ndarray::{Array1, ArrayView1, ArrayView2};


/// Weighted context of the window's center: the sum of `idf[i] * embeddings[.., i]`
/// over every other position. Unresolved slots contribute nothing.
/// The result is a raw sum, it is not normalized by the number or weight of the neighbours.
pub fn compute_context(window: &ContextWindow, idf: ArrayView1<f32>, embeddings: ArrayView2<f32>) -> Array1<f32> {
    let mut out = Array1::zeros(embeddings.nrows());
    compute_context_into(window, idf, embeddings, &mut out);
    out
}

/// Same as `compute_context`, reusing `out` (length `dim`) as the accumulator.
pub fn compute_context_into(window: &ContextWindow, idf: ArrayView1<f32>, embeddings: ArrayView2<f32>, out: &mut Array1<f32>) {

    debug_assert_eq!(out.len(), embeddings.nrows());
    out.fill(0.0);

    for index in window.neighbours().flatten() {
        out.scaled_add(idf[index], &embeddings.column(index));
    }
}


#[cfg(test)]
mod tests {

    use super::{compute_context, compute_context_into};
    use crate::window::ContextWindow;
    use ndarray::{array, Array, Array1, Array2};
    use ndarray_rand::RandomExt;
    use ndarray_rand::rand_distr::Uniform;
    use rand::Rng;

    fn window_of(half_width: usize, slots: &[Option<usize>]) -> ContextWindow {
        let mut window = ContextWindow::new(half_width);
        for slot in slots {
            window.push_back(*slot);
        }
        window
    }

    // golden example computed by hand: columns are the word vectors
    #[test]
    fn weighted_sum_skips_center() {

        let idf = array![1.0f32, 2.0, 0.5, 4.0];
        let embeddings: Array2<f32> = array![
            [1.0, 0.0, 2.0, 1.0],
            [0.0, 1.0, 4.0, -1.0]
        ];

        // center is word 3, its own vector must not contribute
        let window = window_of(2, &[Some(0), Some(1), Some(3), Some(2), Some(1)]);
        let context = compute_context(&window, idf.view(), embeddings.view());

        // 1*[1,0] + 2*[0,1] + 0.5*[2,4] + 2*[0,1]
        assert_eq!(context, array![2.0, 6.0]);
    }

    #[test]
    fn unresolved_neighbours_add_nothing() {

        let idf = array![3.0f32, 1.0];
        let embeddings: Array2<f32> = array![[1.0, 5.0], [2.0, 5.0]];

        let window = window_of(1, &[None, Some(1), Some(0)]);
        let context = compute_context(&window, idf.view(), embeddings.view());
        assert_eq!(context, array![3.0, 6.0]);

        let window = window_of(1, &[None, Some(0), None]);
        assert_eq!(compute_context(&window, idf.view(), embeddings.view()), Array1::<f32>::zeros(2));
    }

    #[test]
    fn reused_buffer_is_reset() {

        let idf = array![1.0f32, 1.0];
        let embeddings: Array2<f32> = array![[1.0, 1.0]];
        let window = window_of(1, &[Some(0), Some(1), Some(1)]);

        let mut out = array![100.0f32];
        compute_context_into(&window, idf.view(), embeddings.view(), &mut out);
        assert_eq!(out, array![2.0]);
    }

    // compare against a plain loop over random matrices and random windows
    #[test]
    fn matches_elementwise_sum() {

        let mut rng = rand::thread_rng();
        let (dim, vocab_size, half_width) = (16, 40, 4);
        let embeddings: Array2<f32> = Array::random((dim, vocab_size), Uniform::new(-1.0, 1.0));
        let idf: Array1<f32> = Array::random(vocab_size, Uniform::new(0.0, 10.0));

        for _ in 0..50 {

            let slots: Vec<Option<usize>> = (0..2 * half_width + 1)
            .map(|_| if rng.gen_bool(0.1) { None } else { Some(rng.gen_range(0..vocab_size)) })
            .collect();
            let window = window_of(half_width, &slots);
            let context = compute_context(&window, idf.view(), embeddings.view());

            let mut expected = vec![0.0f32; dim];
            for (pos, slot) in slots.iter().enumerate() {
                if pos == half_width { continue }
                if let Some(i) = slot {
                    for d in 0..dim {
                        expected[d] += idf[*i] * embeddings[[d, *i]];
                    }
                }
            }

            for d in 0..dim {
                assert!((context[d] - expected[d]).abs() < 1e-4, "dim {} differs: {} vs {}", d, context[d], expected[d]);
            }
        }
    }

}
