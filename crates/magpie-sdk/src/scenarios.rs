//! End-to-end scenarios through the facade.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use magpie_core::{
    impl_attributes, register_default, AccessFault, ArtefactDetector, Attachment, AttributeBag,
    Attributes, BincodeCodec, Blob, ChildDetector, CodecHandle, ConflictPolicy, CoreError,
    DetectionLevel, Model, NamedMember, SlotKind, ViewHandle,
};
use magpie_store::{InMemoryModelStore, ModelStore};
use proptest::prelude::*;

use crate::{Magpie, MagpieConfig, SdkError};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

#[derive(Debug, Default, PartialEq)]
struct Point {
    x: Option<i64>,
}

impl_attributes!(Point {} optional { x });

impl Model for Point {
    fn attachment() -> Attachment {
        Attachment::new().artefact("x", CodecHandle::bincode::<i64>())
    }
}

#[derive(Debug, Default, PartialEq)]
struct Dense {
    m: Vec<f32>,
}

impl_attributes!(Dense { m });

fn dense_attachment() -> Attachment {
    Attachment::new()
        .view(ViewHandle::attributes::<Dense>())
        .artefact("m", CodecHandle::bincode::<Vec<f32>>())
        .detector(ArtefactDetector::new("ints").payload::<i64>(BincodeCodec))
}

#[derive(Clone, Debug, Default, PartialEq)]
struct Block {
    weight: Vec<f32>,
    bias: Vec<f32>,
}

impl_attributes!(Block { weight, bias });

impl Model for Block {}

impl NamedMember for Block {
    fn member_name(&self) -> &str {
        "block"
    }
}

#[derive(Debug, Default, PartialEq)]
struct Network {
    blocks: Vec<Block>,
    label: String,
}

impl_attributes!(Network { blocks, label });

impl Model for Network {
    fn attachment() -> Attachment {
        Attachment::new().detector(
            ChildDetector::new("blocks")
                .with_type::<Vec<Block>>(ViewHandle::named_sequence::<Block>()),
        )
    }
}

fn network() -> Network {
    Network {
        blocks: (0..3)
            .map(|i| Block {
                weight: vec![i as f32; 4],
                bias: vec![-(i as f32)],
            })
            .collect(),
        label: "tiny".into(),
    }
}

fn network_magpie() -> Magpie {
    let mut magpie = Magpie::in_memory();
    magpie.register::<Network>().unwrap();
    magpie.register::<Block>().unwrap();
    magpie
}

// ---------------------------------------------------------------------------
// Round trips
// ---------------------------------------------------------------------------

#[test]
fn declared_value_loads_into_unset_instance() {
    init_tracing();
    let mut magpie = Magpie::in_memory();
    magpie.register::<Point>().unwrap();

    let id = magpie.save(&Point { x: Some(3) }).unwrap();
    let mut fresh = Point::default();
    assert_eq!(fresh.x, None);
    magpie.load(&id, &mut fresh).unwrap();
    assert_eq!(fresh.x, Some(3));
}

#[test]
fn list_of_three_nested_models_round_trips() {
    init_tracing();
    let magpie = network_magpie();
    let id = magpie.save(&network()).unwrap();

    let tree = magpie.store().require(&id).unwrap();
    let blocks = magpie
        .store()
        .require(&tree.child("blocks").unwrap().id)
        .unwrap();
    let order: Vec<&str> = blocks.children.iter().map(|c| c.slot.as_str()).collect();
    assert_eq!(order, vec!["block_0", "block_1", "block_2"]);

    let mut target = Network {
        blocks: vec![Block::default(); 3],
        label: String::new(),
    };
    magpie.load(&id, &mut target).unwrap();
    assert_eq!(target.blocks, network().blocks);
    // Strings are not detected by default.
    assert_eq!(target.label, "");
}

#[test]
fn empty_collections_are_rebuilt_on_load() {
    #[derive(Debug, Default, PartialEq)]
    struct Curve {
        points: Vec<f32>,
        table: BTreeMap<String, f32>,
    }

    impl_attributes!(Curve { points, table });

    impl Model for Curve {
        fn attachment() -> Attachment {
            Attachment::new().detector(ArtefactDetector::new("floats").payload::<f32>(BincodeCodec))
        }
    }

    let mut magpie = Magpie::in_memory();
    magpie.register::<Curve>().unwrap();
    let curve = Curve {
        points: vec![1.0, 2.0, 3.0],
        table: [("lr".to_string(), 0.5)].into_iter().collect(),
    };
    let id = magpie.save(&curve).unwrap();
    let loaded: Curve = magpie.load_new(&id).unwrap();
    assert_eq!(loaded, curve);
}

#[test]
fn storage_member_holds_the_walked_container() {
    #[derive(Default)]
    struct Trainer {
        state: AttributeBag,
        note: String,
    }

    impl_attributes!(Trainer { state, note });

    impl Model for Trainer {
        fn attachment() -> Attachment {
            Attachment::new()
                .storage_member("state", ViewHandle::attributes::<Trainer>())
                .view(ViewHandle::attributes::<AttributeBag>())
                .artefact("lr", CodecHandle::bincode::<f64>())
                .artefact("step", CodecHandle::bincode::<u64>())
        }
    }

    let mut magpie = Magpie::in_memory();
    magpie.register::<Trainer>().unwrap();
    let trainer = Trainer {
        state: AttributeBag::new()
            .with("lr", 0.1f64)
            .with("step", 7u64)
            .with("scratch", String::from("not stored")),
        note: "run".into(),
    };
    let id = magpie.save(&trainer).unwrap();
    let tree = magpie.store().require(&id).unwrap();
    assert_eq!(tree.slots().collect::<Vec<_>>(), vec!["lr", "step"]);

    let loaded: Trainer = magpie.load_new(&id).unwrap();
    assert_eq!(loaded.state.get::<f64>("lr"), Some(&0.1));
    assert_eq!(loaded.state.get::<u64>("step"), Some(&7));
    assert!(!loaded.state.contains("scratch"));
}

#[test]
fn blobs_are_detected_by_default() {
    #[derive(Debug, Default, PartialEq)]
    struct Asset {
        payload: Blob,
    }

    impl_attributes!(Asset { payload });

    impl Model for Asset {}

    let mut magpie = Magpie::in_memory();
    magpie.register::<Asset>().unwrap();
    let asset = Asset {
        payload: Blob::from(vec![0xde, 0xad, 0xbe, 0xef]),
    };
    let id = magpie.save(&asset).unwrap();
    assert_eq!(magpie.load_new::<Asset>(&id).unwrap(), asset);
}

// ---------------------------------------------------------------------------
// Attachment
// ---------------------------------------------------------------------------

#[test]
fn five_identical_attachments_equal_one() {
    let mut once = Magpie::in_memory();
    once.attach::<Dense>(&dense_attachment()).unwrap();
    let mut five = Magpie::in_memory();
    for _ in 0..5 {
        five.attach::<Dense>(&dense_attachment()).unwrap();
    }

    let a = once.catalog().get::<Dense>().unwrap();
    let b = five.catalog().get::<Dense>().unwrap();
    assert_eq!(**a, **b);
    assert_eq!(b.declared().len(), 1);
    assert_eq!(b.detectors().len(), 1);

    let model = Dense { m: vec![1.0, 2.0] };
    assert_eq!(once.save(&model).unwrap(), five.save(&model).unwrap());
}

#[test]
fn conflicting_declaration_is_rejected() {
    let mut magpie = Magpie::in_memory();
    magpie.register::<Point>().unwrap();
    let err = magpie
        .attach::<Point>(&Attachment::new().artefact("x", CodecHandle::json::<i64>()))
        .unwrap_err();
    assert!(matches!(
        err,
        SdkError::Core(CoreError::ConfigurationConflict { ref slot, .. }) if slot == "x"
    ));
}

#[test]
fn first_writer_wins_from_toml() {
    let config = MagpieConfig::from_toml_str("conflict_policy = \"first-writer-wins\"").unwrap();
    let mut magpie = Magpie::with_store(Arc::new(InMemoryModelStore::new()), config);
    magpie.register::<Point>().unwrap();
    let record = magpie
        .attach::<Point>(&Attachment::new().artefact("x", CodecHandle::json::<i64>()))
        .unwrap();
    assert_eq!(record.declared_codec("x").unwrap().name(), "bincode");
    assert_eq!(magpie.catalog().policy(), ConflictPolicy::FirstWriterWins);
}

#[test]
fn runtime_defaults_apply_after_refresh() {
    #[derive(serde::Serialize, serde::Deserialize)]
    struct Embedding(Vec<f32>);

    #[derive(Default)]
    struct Holder {
        embedding: Option<Embedding>,
    }

    impl_attributes!(Holder {} optional { embedding });

    impl Model for Holder {}

    let mut magpie = Magpie::in_memory();
    magpie.register::<Holder>().unwrap();
    let holder = Holder {
        embedding: Some(Embedding(vec![0.25; 3])),
    };
    assert!(magpie.classify(&holder).unwrap().is_empty());

    register_default(
        ArtefactDetector::new("embeddings").payload::<Embedding>(BincodeCodec),
        DetectionLevel::Generic,
    );
    assert!(magpie.classify(&holder).unwrap().is_empty());
    magpie.refresh_defaults();
    assert_eq!(magpie.classify(&holder).unwrap().keys(), vec!["embedding"]);
}

proptest! {
    #[test]
    fn repeated_attachment_saves_identically(
        values in proptest::collection::vec(-1.0e3f32..1.0e3, 0..8),
        repeats in 1usize..6,
    ) {
        let mut once = Magpie::in_memory();
        once.attach::<Dense>(&dense_attachment()).unwrap();
        let mut many = Magpie::in_memory();
        for _ in 0..repeats {
            many.attach::<Dense>(&dense_attachment()).unwrap();
        }
        let model = Dense { m: values };
        prop_assert_eq!(once.save(&model).unwrap(), many.save(&model).unwrap());
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[test]
fn nested_model_without_artefacts_yields_no_children() {
    #[derive(Default)]
    struct Meta {
        label: String,
        tags: Vec<String>,
    }

    impl_attributes!(Meta { label, tags });

    impl Model for Meta {}

    #[derive(Default)]
    struct Outer {
        meta: Meta,
        weight: Vec<f32>,
    }

    impl_attributes!(Outer { meta, weight });

    impl Model for Outer {}

    let mut magpie = Magpie::in_memory();
    magpie.register::<Outer>().unwrap();
    magpie.register::<Meta>().unwrap();
    let outer = Outer {
        meta: Meta {
            label: "m".into(),
            tags: vec!["a".into()],
        },
        weight: vec![1.0],
    };

    let classification = magpie.classify(&outer).unwrap();
    assert_eq!(classification.keys(), vec!["weight"]);
    assert_eq!(classification.ignored, vec!["meta"]);

    let id = magpie.save(&outer).unwrap();
    let tree = magpie.store().require(&id).unwrap();
    assert!(tree.children.is_empty());
    assert_eq!(tree.artefacts.len(), 1);
}

#[test]
fn classification_is_deterministic() {
    let magpie = network_magpie();
    let first = magpie.trace(&network()).unwrap();
    let second = magpie.trace(&network()).unwrap();
    assert_eq!(first, second);
    assert!(first.contains("(blocks) named-sequence<"));
    assert!(first.contains("(block_2) attributes<"));
    assert_eq!(
        magpie.save(&network()).unwrap(),
        magpie.save(&network()).unwrap()
    );
}

#[test]
fn faulting_member_is_ignored() {
    struct Sensor {
        reading: Vec<f32>,
    }

    impl Attributes for Sensor {
        fn attribute_names(&self) -> Vec<String> {
            vec!["calibration".into(), "reading".into()]
        }

        fn attribute(&self, name: &str) -> Result<Option<&dyn Any>, AccessFault> {
            match name {
                "reading" => Ok(Some(&self.reading)),
                _ => Err(AccessFault::Host {
                    key: name.into(),
                    reason: "device offline".into(),
                }),
            }
        }

        fn attribute_mut(&mut self, name: &str) -> Result<Option<&mut dyn Any>, AccessFault> {
            match name {
                "reading" => Ok(Some(&mut self.reading)),
                _ => Err(AccessFault::Computed { key: name.into() }),
            }
        }

        fn set_attribute(&mut self, name: &str, _: Box<dyn Any>) -> Result<(), AccessFault> {
            Err(AccessFault::Computed { key: name.into() })
        }
    }

    let mut magpie = Magpie::in_memory();
    magpie
        .attach::<Sensor>(&Attachment::new().view(ViewHandle::attributes::<Sensor>()))
        .unwrap();
    let sensor = Sensor {
        reading: vec![20.5, 21.0],
    };
    let classification = magpie.classify(&sensor).unwrap();
    assert_eq!(classification.keys(), vec!["reading"]);
    assert_eq!(classification.ignored, vec!["calibration"]);

    let id = magpie.save(&sensor).unwrap();
    let mut target = Sensor { reading: vec![] };
    magpie.load(&id, &mut target).unwrap();
    assert_eq!(target.reading, vec![20.5, 21.0]);
}

#[test]
fn predicate_detector_selects_children() {
    #[derive(Default)]
    struct Pipeline {
        encoder: AttributeBag,
        decoder: AttributeBag,
    }

    impl_attributes!(Pipeline { encoder, decoder });

    impl Model for Pipeline {
        fn attachment() -> Attachment {
            Attachment::new().detector(ChildDetector::new("stages").with_predicate(
                "non-empty-bag",
                |v| v.downcast_ref::<AttributeBag>().is_some_and(|b| !b.is_empty()),
                ViewHandle::attributes::<AttributeBag>(),
            ))
        }
    }

    let mut magpie = Magpie::in_memory();
    magpie.register::<Pipeline>().unwrap();
    let pipeline = Pipeline {
        encoder: AttributeBag::new().with("w", vec![1.0f32, 2.0]),
        decoder: AttributeBag::new(),
    };
    let classification = magpie.classify(&pipeline).unwrap();
    assert_eq!(classification.keys(), vec!["encoder"]);

    let id = magpie.save(&pipeline).unwrap();
    let mut target = Pipeline {
        encoder: AttributeBag::new().with("w", Vec::<f32>::new()),
        decoder: AttributeBag::new(),
    };
    magpie.load(&id, &mut target).unwrap();
    assert_eq!(target.encoder.get::<Vec<f32>>("w"), Some(&vec![1.0, 2.0]));
}

// ---------------------------------------------------------------------------
// Adapter views and detector shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Default, PartialEq)]
struct Scaler {
    with_mean: bool,
    samples: Vec<f64>,
    mean_: Vec<f64>,
    scale_: Vec<f64>,
}

impl_attributes!(Scaler { with_mean, samples, mean_, scale_ });

#[derive(Debug, Default, PartialEq)]
struct Preprocess {
    scaler: Scaler,
}

impl_attributes!(Preprocess { scaler });

impl Model for Preprocess {
    fn attachment() -> Attachment {
        Attachment::new().detector(
            ChildDetector::new("estimators")
                .with_type::<Scaler>(ViewHandle::fitted_attributes::<Scaler>()),
        )
    }
}

#[test]
fn fitted_members_only_are_stored() {
    let mut magpie = Magpie::in_memory();
    magpie.register::<Preprocess>().unwrap();
    let fitted = Preprocess {
        scaler: Scaler {
            with_mean: true,
            samples: vec![1.0, 2.0, 3.0],
            mean_: vec![2.0],
            scale_: vec![0.8],
        },
    };

    let classification = magpie.classify(&fitted).unwrap();
    match &classification.slot("scaler").unwrap().kind {
        SlotKind::Child(child) => {
            assert_eq!(child.classification.keys(), vec!["mean_", "scale_"]);
        }
        other => panic!("scaler should be a child, got {other:?}"),
    }
    assert!(magpie
        .trace(&fitted)
        .unwrap()
        .contains("(scaler) fitted<attributes<"));

    let id = magpie.save(&fitted).unwrap();
    let mut target = Preprocess {
        scaler: Scaler {
            samples: vec![9.0],
            ..Scaler::default()
        },
    };
    magpie.load(&id, &mut target).unwrap();
    assert_eq!(target.scaler.mean_, vec![2.0]);
    assert_eq!(target.scaler.scale_, vec![0.8]);
    assert_eq!(target.scaler.samples, vec![9.0]);
    assert!(!target.scaler.with_mean);
}

#[test]
fn collection_promotion_can_be_turned_off() {
    #[derive(Default)]
    struct Samples {
        points: Vec<f32>,
    }

    impl_attributes!(Samples { points });

    let with_detector = |detector: ArtefactDetector| {
        let mut magpie = Magpie::in_memory();
        magpie
            .attach::<Samples>(
                &Attachment::new()
                    .view(ViewHandle::attributes::<Samples>())
                    .detector(detector),
            )
            .unwrap();
        magpie
    };
    let samples = Samples {
        points: vec![0.5; 16],
    };

    let promoted = with_detector(ArtefactDetector::new("floats").payload::<f32>(BincodeCodec));
    let classification = promoted.classify(&samples).unwrap();
    assert!(matches!(
        classification.slot("points").unwrap().kind,
        SlotKind::Child(_)
    ));
    let tree = promoted
        .store()
        .require(&promoted.save(&samples).unwrap())
        .unwrap();
    let points = promoted
        .store()
        .require(&tree.child("points").unwrap().id)
        .unwrap();
    assert_eq!(points.artefacts.len(), 16);

    let whole = with_detector(
        ArtefactDetector::new("floats")
            .payload::<f32>(BincodeCodec)
            .without_collections(),
    );
    let classification = whole.classify(&samples).unwrap();
    match &classification.slot("points").unwrap().kind {
        SlotKind::Artefact { codec, .. } => assert!(codec.label().contains("Vec<f32>")),
        other => panic!("points should be one artefact, got {other:?}"),
    }
    let tree = whole.store().require(&whole.save(&samples).unwrap()).unwrap();
    assert_eq!(tree.artefacts.len(), 1);
    assert!(tree.children.is_empty());
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn missing_artefact_fails_loudly() {
    let mut magpie = Magpie::in_memory();
    magpie.register::<Point>().unwrap();
    let err = magpie.save(&Point::default()).unwrap_err();
    assert!(matches!(
        err,
        SdkError::Core(CoreError::ArtefactMissing { ref slot, .. }) if slot == "x"
    ));
}

#[test]
fn depth_limit_from_config() {
    let config = MagpieConfig::from_toml_str("max_depth = 1").unwrap();
    let mut magpie = Magpie::with_store(Arc::new(InMemoryModelStore::new()), config);
    magpie.register::<Network>().unwrap();
    magpie.register::<Block>().unwrap();
    assert!(matches!(
        magpie.save(&network()),
        Err(SdkError::Core(CoreError::DepthExceeded { limit: 1 }))
    ));
}

#[test]
fn loading_an_unknown_model_fails() {
    let magpie = network_magpie();
    let other = network_magpie();
    let id = other.save(&network()).unwrap();
    let mut target = Network::default();
    assert!(matches!(
        magpie.load(&id, &mut target),
        Err(SdkError::Core(CoreError::ModelNotFound(_)))
    ));
}
