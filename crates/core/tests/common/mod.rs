//! Sample tag generation for tests.
//!
//! Generated streams mix every structurally decoded tag kind with bodies of
//! varied size, so both header forms and most field layouts are exercised.
//! Everything is driven by a seeded RNG, so a failing seed can be replayed.

#![allow(dead_code)]

use flashtag_core::values::action::{Action, PushValue};
use flashtag_core::values::color::Color;
use flashtag_core::values::geometry::{Bounds, CoordTransform};
use flashtag_core::values::place::PlaceObject3;
use flashtag_core::values::shape::{DefineShape, DefineShape4, ShapeVersion};
use flashtag_core::values::style::{FillStyle, Gradient, GradientStop, LineStyle1, LineStyle2};
use flashtag_core::values::tag::{ActionBlock, DoAction, FrameLabel, Opaque, Tag};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Generate `count` random tags followed by an `End` tag.
///
/// With `with_unknown`, some tags use codes the standard registry does not
/// know; those only decode in lenient mode.
pub fn generate_sample_tags(seed: u64, count: usize, with_unknown: bool) -> Vec<Tag> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut tags = Vec::with_capacity(count + 1);

    for _ in 0..count {
        let kind: u8 = rng.gen_range(0..if with_unknown { 9 } else { 8 });
        let tag = match kind {
            0 => Tag::ShowFrame,
            1 => Tag::SetBackgroundColor(opaque_color(&mut rng)),
            2 => Tag::FrameLabel(FrameLabel {
                name: random_name(&mut rng),
                anchor: rng.gen(),
            }),
            3 => Tag::DoAction(DoAction {
                actions: ActionBlock::Decoded(random_actions(&mut rng)),
            }),
            4 => Tag::DefineShape(random_shape(&mut rng)),
            5 => Tag::DefineShape4(random_shape4(&mut rng)),
            6 => Tag::PlaceObject3(random_placement(&mut rng)),
            7 => Tag::FrameLabel(FrameLabel {
                // Long names push the body past the short header limit.
                name: "x".repeat(rng.gen_range(55..80)),
                anchor: false,
            }),
            _ => Tag::Unknown(Opaque {
                code: rng.gen_range(200..=0x3FF),
                body: (0..rng.gen_range(0..130)).map(|_| rng.gen()).collect(),
            }),
        };
        tags.push(tag);
    }

    tags.push(Tag::End);
    tags
}

fn opaque_color(rng: &mut ChaCha8Rng) -> Color {
    Color::rgb(rng.gen(), rng.gen(), rng.gen())
}

fn any_color(rng: &mut ChaCha8Rng) -> Color {
    Color::rgba(rng.gen(), rng.gen(), rng.gen(), rng.gen())
}

fn random_name(rng: &mut ChaCha8Rng) -> String {
    let alphabet = b"abcdefghijklmnopqrstuvwxyz_0123456789";
    let len = rng.gen_range(1..12);
    (0..len)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect()
}

fn random_bounds(rng: &mut ChaCha8Rng) -> Bounds {
    let min_x = rng.gen_range(-5000..5000);
    let min_y = rng.gen_range(-5000..5000);
    Bounds::new(
        min_x,
        min_y,
        min_x + rng.gen_range(0..20000),
        min_y + rng.gen_range(0..20000),
    )
    .expect("bounds in range")
}

fn random_transform(rng: &mut ChaCha8Rng) -> CoordTransform {
    let mut transform = CoordTransform::translation(rng.gen_range(-2000..2000), rng.gen_range(-2000..2000));
    if rng.gen() {
        transform.scale = Some((rng.gen_range(-200_000..200_000), rng.gen_range(-200_000..200_000)));
    }
    if rng.gen() {
        transform.rotate = Some((rng.gen_range(-70_000..70_000), rng.gen_range(-70_000..70_000)));
    }
    transform
}

fn random_fill(rng: &mut ChaCha8Rng, alpha: bool) -> FillStyle {
    let color = |rng: &mut ChaCha8Rng| if alpha { any_color(rng) } else { opaque_color(rng) };
    match rng.gen_range(0..3) {
        0 => FillStyle::Solid(color(rng)),
        1 => {
            let stops = (0..rng.gen_range(1..=15))
                .map(|i| GradientStop::new(i * 16, color(rng)))
                .collect();
            FillStyle::Linear {
                gradient: Gradient::new(stops).expect("at most 15 stops"),
                transform: random_transform(rng),
            }
        }
        _ => FillStyle::Bitmap {
            bitmap: rng.gen(),
            transform: random_transform(rng),
            repeat: rng.gen(),
            smoothed: rng.gen(),
        },
    }
}

fn random_shape(rng: &mut ChaCha8Rng) -> DefineShape {
    let version = match rng.gen_range(0..3) {
        0 => ShapeVersion::One,
        1 => ShapeVersion::Two,
        _ => ShapeVersion::Three,
    };
    let alpha = version == ShapeVersion::Three;
    let color = |rng: &mut ChaCha8Rng| if alpha { any_color(rng) } else { opaque_color(rng) };

    DefineShape {
        version,
        identifier: rng.gen(),
        bounds: random_bounds(rng),
        fill_styles: (0..rng.gen_range(0..4)).map(|_| random_fill(rng, alpha)).collect(),
        line_styles: (0..rng.gen_range(0..4))
            .map(|_| LineStyle1::new(rng.gen_range(0..400), color(rng)).expect("width in range"))
            .collect(),
        edges: (0..rng.gen_range(0..40)).map(|_| rng.gen()).collect(),
    }
}

fn random_shape4(rng: &mut ChaCha8Rng) -> DefineShape4 {
    DefineShape4 {
        identifier: rng.gen(),
        bounds: random_bounds(rng),
        edge_bounds: random_bounds(rng),
        fill_winding: rng.gen(),
        fill_styles: (0..rng.gen_range(0..3)).map(|_| random_fill(rng, true)).collect(),
        line_styles: (0..rng.gen_range(0..3))
            .map(|_| {
                let mut style = LineStyle2::new(rng.gen_range(0..400), any_color(rng))
                    .expect("width in range");
                style.scale_horizontal = rng.gen();
                style.scale_vertical = rng.gen();
                style.pixel_hinting = rng.gen();
                style
            })
            .collect(),
        edges: (0..rng.gen_range(0..40)).map(|_| rng.gen()).collect(),
    }
}

fn random_actions(rng: &mut ChaCha8Rng) -> Vec<Action> {
    (0..rng.gen_range(0..8))
        .map(|_| match rng.gen_range(0..5) {
            0 => Action::Basic(rng.gen_range(0x01..=0x7F)),
            1 => Action::GotoFrame(rng.gen()),
            2 => Action::GotoLabel(random_name(rng)),
            3 => Action::Jump(rng.gen()),
            _ => Action::Push(vec![
                PushValue::Integer(rng.gen()),
                PushValue::String(random_name(rng)),
                PushValue::Constant(rng.gen()),
                PushValue::Boolean(rng.gen()),
            ]),
        })
        .collect()
}

fn random_placement(rng: &mut ChaCha8Rng) -> PlaceObject3 {
    let mut place = PlaceObject3::new(rng.gen_range(1..1000), rng.gen());
    if rng.gen() {
        place.transform = Some(random_transform(rng));
    }
    if rng.gen() {
        place.name = Some(random_name(rng));
    }
    if rng.gen() {
        place.visible = Some(rng.gen());
    }
    place
}
