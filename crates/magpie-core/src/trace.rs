//! Text rendering of a classification, for debugging.
//!
//! ```text
//! attributes<app::Encoder> {
//!   (hidden) [bincode:i64]
//!   (head) attributes<app::Head> {
//!     (scale) [bincode:f32]
//!   }
//! }
//! ```

use std::fmt::Write;

use crate::classify::{Classification, Origin, SlotKind};

pub fn render(classification: &Classification) -> String {
    let mut out = String::new();
    out.push_str(classification.view.name());
    out.push_str(" {\n");
    render_body(&mut out, classification, 1);
    out.push_str("}\n");
    out
}

fn render_body(out: &mut String, classification: &Classification, depth: usize) {
    let indent = "  ".repeat(depth);
    for slot in &classification.slots {
        match &slot.kind {
            SlotKind::Artefact { codec, origin } => {
                let marker = match origin {
                    Origin::Declared => " declared",
                    Origin::Detected => "",
                };
                let _ = writeln!(out, "{indent}({}) [{}]{marker}", slot.key, codec.label());
            }
            SlotKind::Child(child) => {
                let _ = writeln!(
                    out,
                    "{indent}({}) {} {{",
                    slot.key,
                    child.target.view.name()
                );
                render_body(out, &child.classification, depth + 1);
                let _ = writeln!(out, "{indent}}}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::classify::Classifier;
    use crate::codec::CodecHandle;
    use crate::codecs::BincodeCodec;
    use crate::config::{Attachment, ConflictPolicy, Configuration};
    use crate::detector::ArtefactDetector;
    use crate::registry::{DetectionLevel, DetectorRegistry};
    use crate::view::ViewHandle;
    use crate::views::AttributeBag;

    #[test]
    fn renders_nested_tree() {
        let catalog = Catalog::new();
        let mut defaults = DetectorRegistry::new();
        defaults.register(
            ArtefactDetector::new("ints").payload::<i64>(BincodeCodec),
            DetectionLevel::Generic,
        );
        let config = Configuration::attach::<AttributeBag>(
            &Attachment::new()
                .view(ViewHandle::attributes::<AttributeBag>())
                .artefact("x", CodecHandle::bincode::<i64>()),
            ConflictPolicy::Reject,
        )
        .unwrap();
        let bag = AttributeBag::new()
            .with("x", 3i64)
            .with("list", vec![1i64, 2]);

        let classification = Classifier::new(&catalog, &defaults)
            .classify(&config, &bag)
            .unwrap();
        let text = render(&classification);
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].starts_with("attributes<"));
        assert_eq!(lines[1], "  (x) [bincode:i64] declared");
        assert!(lines[2].starts_with("  (list) sequence<i64> {"));
        assert_eq!(lines[3], "    (0) [bincode:i64]");
        assert_eq!(lines[4], "    (1) [bincode:i64]");
        assert_eq!(lines[5], "  }");
        assert_eq!(lines[6], "}");
    }
}
