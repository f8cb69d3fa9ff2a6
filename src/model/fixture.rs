//! In-memory ONNX models for tests and benches
//!
//! Builds the protobuf bytes of a graph equivalent to a fitted linear
//! classifier: `label = argmax(X · W, axis=1)`, with a float input `X` of
//! shape `[N, n_features]` and an int64 output named `output_label`, the same
//! input/output layout skl2onnx emits for scikit-learn classifiers.

const IR_VERSION: i64 = 8;
const OPSET_VERSION: i64 = 13;

const ELEM_FLOAT: i64 = 1;
const ELEM_DOUBLE: i64 = 11;
const ELEM_INT64: i64 = 7;
const ATTR_INT: i64 = 2;

/// Protobuf message writer covering the handful of wire types ONNX needs
#[derive(Default)]
struct Message(Vec<u8>);

impl Message {
    fn varint(&mut self, mut v: u64) {
        while v >= 0x80 {
            self.0.push((v as u8) | 0x80);
            v >>= 7;
        }
        self.0.push(v as u8);
    }

    fn key(&mut self, field: u32, wire_type: u8) {
        self.varint(((field as u64) << 3) | wire_type as u64);
    }

    fn int(mut self, field: u32, v: i64) -> Self {
        self.key(field, 0);
        self.varint(v as u64);
        self
    }

    fn bytes(mut self, field: u32, data: &[u8]) -> Self {
        self.key(field, 2);
        self.varint(data.len() as u64);
        self.0.extend_from_slice(data);
        self
    }

    fn string(self, field: u32, s: &str) -> Self {
        self.bytes(field, s.as_bytes())
    }

    fn message(self, field: u32, m: Message) -> Self {
        self.bytes(field, &m.0)
    }
}

/// ValueInfoProto for a 2-D tensor with a symbolic batch dimension
fn value_info(name: &str, elem_type: i64, dims: &[Option<i64>]) -> Message {
    let mut shape = Message::default();
    for dim in dims {
        let d = match dim {
            Some(v) => Message::default().int(1, *v),
            None => Message::default().string(2, "N"),
        };
        shape = shape.message(1, d);
    }
    let tensor_type = Message::default().int(1, elem_type).message(2, shape);
    let type_proto = Message::default().message(1, tensor_type);
    Message::default().string(1, name).message(2, type_proto)
}

/// Encode a linear argmax classifier
///
/// `weights` holds one row per feature and one column per class, so the
/// predicted label is the index of the class column with the largest score.
/// `double_input` switches `X` to float64, which adds a Cast node.
pub fn linear_argmax_model(weights: &[Vec<f32>], double_input: bool) -> Vec<u8> {
    let n_features = weights.len() as i64;
    let n_classes = weights.first().map(Vec::len).unwrap_or(0) as i64;

    let raw: Vec<u8> = weights
        .iter()
        .flatten()
        .flat_map(|w| w.to_le_bytes())
        .collect();
    let initializer = Message::default()
        .int(1, n_features)
        .int(1, n_classes)
        .int(2, ELEM_FLOAT)
        .string(8, "W")
        .bytes(9, &raw);

    let mut graph = Message::default();
    let matmul_input = if double_input {
        let cast = Message::default()
            .string(1, "X")
            .string(2, "X_float")
            .string(3, "cast")
            .string(4, "Cast")
            .message(5, Message::default().string(1, "to").int(3, ELEM_FLOAT).int(20, ATTR_INT));
        graph = graph.message(1, cast);
        "X_float"
    } else {
        "X"
    };

    let matmul = Message::default()
        .string(1, matmul_input)
        .string(1, "W")
        .string(2, "scores")
        .string(3, "matmul")
        .string(4, "MatMul");
    let argmax = Message::default()
        .string(1, "scores")
        .string(2, "output_label")
        .string(3, "argmax")
        .string(4, "ArgMax")
        .message(5, Message::default().string(1, "axis").int(3, 1).int(20, ATTR_INT))
        .message(5, Message::default().string(1, "keepdims").int(3, 0).int(20, ATTR_INT));

    let input_type = if double_input { ELEM_DOUBLE } else { ELEM_FLOAT };
    graph = graph
        .message(1, matmul)
        .message(1, argmax)
        .string(2, "digits")
        .message(5, initializer)
        .message(11, value_info("X", input_type, &[None, Some(n_features)]))
        .message(12, value_info("output_label", ELEM_INT64, &[None]));

    Message::default()
        .int(1, IR_VERSION)
        .string(2, "digit-classifier-fixture")
        .message(7, graph)
        .message(8, Message::default().string(1, "").int(2, OPSET_VERSION))
        .0
}

/// Weights that make the label equal the index of the brightest of the
/// first `n_classes` pixels
pub fn brightest_pixel_weights(n_features: usize, n_classes: usize) -> Vec<Vec<f32>> {
    (0..n_features)
        .map(|i| (0..n_classes).map(|c| if i == c { 1.0 } else { 0.0 }).collect())
        .collect()
}
