//! Text encoding of a [`KdTree`].
//!
//! Nodes are written in preorder, one record per line:
//!
//! ```text
//! <axis>
//! <index>
//! <coord 0> <coord 1> ... <coord D-1>
//! <left subtree, or -1 if there is none>
//! <right subtree, or -1 if there is none>
//! ```
//!
//! Numbers are written with `Display`, which is the shortest literal that parses back to the
//! same value, so a decoded tree answers every query exactly like the tree that was encoded. An
//! empty tree encodes to an empty stream.

use std::fmt;
use std::io::{self, BufRead, Write};

use tracing::debug;

use crate::error::{KdTreeError, Result};
use crate::kdtree::index::KdNode;
use crate::kdtree::{IndexedPoint, KdTree};
use crate::r#type::IndexableNum;

/// The wire spelling of [`Record::Absent`].
const ABSENT_MARKER: &str = "-1";

/// The first line of every subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Record {
    /// A node splitting on this axis follows.
    Present(usize),
    /// The subtree does not exist.
    Absent,
}

/// Write `tree` to `out`.
pub fn encode<N: IndexableNum, W: Write>(tree: &KdTree<N>, out: &mut W) -> io::Result<()> {
    write!(out, "{tree}")
}

/// Encode `tree` into a `String`.
pub fn encode_to_string<N: IndexableNum>(tree: &KdTree<N>) -> String {
    tree.to_string()
}

impl<N: IndexableNum> fmt::Display for KdTree<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nodes.is_empty() {
            return Ok(());
        }

        // `None` entries are absent children still to be written
        let mut stack: Vec<Option<usize>> = vec![Some(0)];
        while let Some(entry) = stack.pop() {
            let Some(id) = entry else {
                writeln!(f, "{ABSENT_MARKER}")?;
                continue;
            };

            let node = &self.nodes[id];
            writeln!(f, "{}", node.axis)?;
            writeln!(f, "{}", node.location.index)?;
            let mut coords = node.location.coords.iter();
            if let Some(first) = coords.next() {
                write!(f, "{first}")?;
            }
            for coord in coords {
                write!(f, " {coord}")?;
            }
            writeln!(f)?;

            stack.push(node.right);
            stack.push(node.left);
        }
        Ok(())
    }
}

/// Read a tree written by [`encode`].
///
/// Blank lines after the root subtree are ignored. Anything else that does not belong to the
/// encoding is an error; no partially decoded tree is returned.
pub fn decode<N: IndexableNum, R: BufRead>(input: R) -> Result<KdTree<N>> {
    let mut reader = LineReader::new(input);

    let root_axis = match reader.next_line()? {
        None => return Ok(KdTree::empty()),
        Some(line) => parse_record(&line, reader.line)?,
    };
    let Record::Present(root_axis) = root_axis else {
        reader.expect_end()?;
        return Ok(KdTree::empty());
    };

    let root = reader.read_node(root_axis, None)?;
    let dimension = root.location.coords.len();
    if dimension == 0 {
        return Err(KdTreeError::InvalidNode {
            line: reader.line,
            message: "node has no coordinates".to_string(),
        });
    }
    check_axis(root_axis, dimension, reader.line - 2)?;

    let mut nodes = vec![root];
    // Children still to be read, as (parent, is_left). Left is popped first.
    let mut pending: Vec<(usize, bool)> = vec![(0, false), (0, true)];

    while let Some((parent, is_left)) = pending.pop() {
        let line = reader.require_line()?;
        let axis_line = reader.line;
        let Record::Present(axis) = parse_record(&line, axis_line)? else {
            continue;
        };
        check_axis(axis, dimension, axis_line)?;

        let node = reader.read_node(axis, Some(dimension))?;
        let id = nodes.len();
        nodes.push(node);
        if is_left {
            nodes[parent].left = Some(id);
        } else {
            nodes[parent].right = Some(id);
        }
        pending.push((id, false));
        pending.push((id, true));
    }

    reader.expect_end()?;
    debug!(num_items = nodes.len(), dimension, "decoded kd-tree");
    Ok(KdTree { nodes, dimension })
}

fn parse_record(line: &str, line_number: usize) -> Result<Record> {
    let trimmed = line.trim();
    if trimmed == ABSENT_MARKER {
        return Ok(Record::Absent);
    }
    trimmed
        .parse::<usize>()
        .map(Record::Present)
        .map_err(|_| KdTreeError::Parse {
            line: line_number,
            message: format!("expected an axis or {ABSENT_MARKER}, got {trimmed:?}"),
        })
}

fn check_axis(axis: usize, dimension: usize, line: usize) -> Result<()> {
    if axis >= dimension {
        return Err(KdTreeError::InvalidNode {
            line,
            message: format!("axis {axis} is out of range for {dimension} coordinates"),
        });
    }
    Ok(())
}

/// Line-oriented reader that tracks the 1-based number of the last line read.
struct LineReader<R> {
    input: R,
    buf: String,
    line: usize,
}

impl<R: BufRead> LineReader<R> {
    fn new(input: R) -> Self {
        Self {
            input,
            buf: String::new(),
            line: 0,
        }
    }

    /// The next line, or `None` at the end of the stream. Blank lines before the root are
    /// skipped so that an all-whitespace stream decodes to an empty tree.
    fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            self.buf.clear();
            if self.input.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;
            if !self.buf.trim().is_empty() {
                return Ok(Some(self.buf.clone()));
            }
        }
    }

    /// The next line, which must exist.
    fn require_line(&mut self) -> Result<String> {
        self.buf.clear();
        if self.input.read_line(&mut self.buf)? == 0 {
            return Err(KdTreeError::UnexpectedEof {
                line: self.line + 1,
            });
        }
        self.line += 1;
        Ok(self.buf.clone())
    }

    /// Read the index and coordinate lines of a node.
    fn read_node<N: IndexableNum>(
        &mut self,
        axis: usize,
        dimension: Option<usize>,
    ) -> Result<KdNode<N>> {
        let index_line = self.require_line()?;
        let index = index_line
            .trim()
            .parse::<u32>()
            .map_err(|_| KdTreeError::Parse {
                line: self.line,
                message: format!("expected a point index, got {:?}", index_line.trim()),
            })?;

        let coords_line = self.require_line()?;
        let coords = coords_line
            .split_whitespace()
            .map(|field| {
                field.parse::<N>().map_err(|_| KdTreeError::Parse {
                    line: self.line,
                    message: format!("invalid coordinate {field:?}"),
                })
            })
            .collect::<Result<Vec<N>>>()?;

        if let Some(dimension) = dimension {
            if coords.len() != dimension {
                return Err(KdTreeError::InvalidNode {
                    line: self.line,
                    message: format!(
                        "expected {dimension} coordinates, got {}",
                        coords.len()
                    ),
                });
            }
        }

        Ok(KdNode {
            axis,
            location: IndexedPoint::new(index, coords),
            left: None,
            right: None,
        })
    }

    /// Only blank lines may remain.
    fn expect_end(&mut self) -> Result<()> {
        loop {
            self.buf.clear();
            if self.input.read_line(&mut self.buf)? == 0 {
                return Ok(());
            }
            self.line += 1;
            if !self.buf.trim().is_empty() {
                return Err(KdTreeError::TrailingData { line: self.line });
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::kdtree::KdTreeIndex;

    fn square() -> KdTree<f64> {
        KdTree::build(&[[0., 0.], [1., 1.], [2., 2.], [3., 3.]]).unwrap()
    }

    #[test]
    fn encodes_in_preorder() {
        let text = square().to_text();
        // root [2, 2] on x, left subtree [1, 1] -> [0, 0] on y then x, right leaf [3, 3]
        let expected = "0\n2\n2 2\n1\n1\n1 1\n0\n0\n0 0\n-1\n-1\n-1\n1\n3\n3 3\n-1\n-1\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn encodes_to_writer_and_string_alike() {
        let tree = square();
        let mut buf = Vec::new();
        encode(&tree, &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), encode_to_string(&tree));
        assert_eq!(format!("{tree}"), tree.to_text());
    }

    #[test]
    fn encode_reports_writer_errors() {
        // room for the first line only
        let mut buf = [0_u8; 2];
        let mut out = &mut buf[..];
        let err = encode(&square(), &mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WriteZero);
    }

    #[test]
    fn round_trips_exactly() {
        let points = vec![
            vec![0.1, -2.5e-300],
            vec![1.0 / 3.0, f64::MAX],
            vec![-0.0, 123456789.123456789],
            vec![f64::MIN_POSITIVE, 7.],
            vec![f64::INFINITY, -1.],
        ];
        let tree = KdTree::build(&points).unwrap();
        let decoded: KdTree<f64> = KdTree::from_text(&tree.to_text()).unwrap();
        assert_eq!(decoded, tree);
        assert_eq!(decoded.to_text(), tree.to_text(), "re-encoding is byte-identical");
    }

    #[test]
    fn round_trips_integers() {
        let points: Vec<[i64; 3]> = vec![[i64::MIN, 0, 5], [i64::MAX, -3, 2], [7, 7, 7]];
        let tree = KdTree::build(&points).unwrap();
        let decoded = tree.to_text().parse::<KdTree<i64>>().unwrap();
        assert_eq!(decoded, tree);
    }

    #[test]
    fn empty_streams_decode_to_empty_tree() {
        for text in ["", "\n\n", "  \n", "-1\n", "-1\n\n"] {
            let tree = KdTree::<f64>::from_text(text).unwrap();
            assert!(tree.is_empty(), "{text:?}");
        }
        assert_eq!(KdTree::<f64>::empty().to_text(), "");
    }

    #[test]
    fn accepts_trailing_whitespace() {
        let text = "0\n0\n1 2 \n-1\n-1\n\n   \n";
        let tree = KdTree::<f64>::from_text(text).unwrap();
        assert_eq!(tree.num_items(), 1);
        assert_eq!(tree.dimension(), Some(2));
    }

    #[test]
    fn rejects_truncated_stream() {
        let text = square().to_text();
        let lines: Vec<&str> = text.lines().collect();
        for end in 1..lines.len() {
            let truncated = lines[..end].join("\n");
            let result = KdTree::<f64>::from_text(&truncated);
            assert!(
                matches!(result, Err(KdTreeError::UnexpectedEof { .. })),
                "truncated after {end} lines: {result:?}"
            );
        }
    }

    #[test]
    fn rejects_malformed_records() {
        let cases = [
            ("x\n0\n1\n-1\n-1\n", 1),
            ("0\nfirst\n1\n-1\n-1\n", 2),
            ("0\n0\n1 two\n-1\n-1\n", 3),
            ("0\n0\n1\n-2\n-1\n", 4),
        ];
        for (text, line) in cases {
            match KdTree::<f64>::from_text(text) {
                Err(KdTreeError::Parse { line: l, .. }) => assert_eq!(l, line, "{text:?}"),
                other => panic!("expected a parse error for {text:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_inconsistent_nodes() {
        // left child has three coordinates under a two-dimensional root
        let text = "0\n0\n1 1\n1\n1\n0 0 0\n-1\n-1\n-1\n";
        assert!(matches!(
            KdTree::<f64>::from_text(text),
            Err(KdTreeError::InvalidNode { line: 6, .. })
        ));

        // axis 2 cannot split two coordinates
        let text = "2\n0\n1 1\n-1\n-1\n";
        assert!(matches!(
            KdTree::<f64>::from_text(text),
            Err(KdTreeError::InvalidNode { line: 1, .. })
        ));
    }

    #[test]
    fn rejects_trailing_data() {
        let text = format!("{}0\n", square().to_text());
        assert!(matches!(
            KdTree::<f64>::from_text(&text),
            Err(KdTreeError::TrailingData { line: 18 })
        ));
    }

    #[test]
    fn decodes_unbalanced_trees() {
        // A chain of right children, deeper than any balanced build would produce.
        let depth = 10_000;
        let mut text = String::new();
        for i in 0..depth {
            text.push_str(&format!("0\n{i}\n{i}\n-1\n"));
        }
        text.push_str("-1\n");

        let tree = KdTree::<u32>::from_text(&text).unwrap();
        assert_eq!(tree.num_items(), depth);
        let nearest = tree.nearest_neighbor(&[9_999]).unwrap().unwrap();
        assert_eq!(nearest.index(), 9_999);
        assert_eq!(tree.to_text(), text);
    }
}
