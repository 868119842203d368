//! Property-based invariant tests
//!
//! These tests verify invariants that must hold for **any** input:
//!
//! 1. Parser never panics and always gets back to Ground.
//! 2. Dispatched actions do not depend on how the input is chunked.
//! 3. Colon and semicolon extended colors produce the same rendition.
//! 4. `CSI 0 m` resets from any state.
//! 5. Command id ranges decide which frame types validate.

use catty::parser::params::DEFAULT_MAX_PARAMS;
use catty::parser::{Action, Params, Parser, ParserState};
use catty::rpc::{RpcFrame, RpcFrameType, RpcSequence};
use catty::{GraphicRenditionState, RpcError};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

fn parse_all(chunks: &[&[u8]]) -> (Vec<Action>, Parser) {
    let mut parser = Parser::new();
    let mut actions = Vec::new();
    for chunk in chunks {
        parser.parse(chunk, |action| actions.push(action));
    }
    (actions, parser)
}

fn rendition_after(input: &[u8]) -> GraphicRenditionState {
    let mut rendition = GraphicRenditionState::new();
    let (actions, _) = parse_all(&[input]);
    for action in actions {
        if let Action::Sgr(commands) = action {
            rendition.apply_all(commands);
        }
    }
    rendition
}

fn frame(id: u32, frame_type: RpcFrameType) -> Result<RpcFrame, RpcError> {
    let params = Params::parse(format!("{};1", id).as_bytes(), DEFAULT_MAX_PARAMS).unwrap();
    RpcFrame::validate(&RpcSequence::new(params, frame_type), 1)
}

/// Bytes biased toward escape-sequence structure
fn sequence_bytes() -> impl Strategy<Value = Vec<u8>> {
    let byte = prop_oneof![
        4 => any::<u8>(),
        2 => Just(0x1b),
        1 => Just(b'['),
        1 => Just(b']'),
        1 => Just(b';'),
        1 => Just(b':'),
        1 => Just(b'>'),
        1 => Just(b'm'),
        1 => Just(0x07),
        2 => (b'0'..=b'9'),
    ];
    proptest::collection::vec(byte, 0..256)
}

/// Well-formed SGR parameter lists
fn sgr_params() -> impl Strategy<Value = Vec<u32>> {
    let code = prop_oneof![
        (0u32..=9),
        (21u32..=29),
        (30u32..=49),
        (90u32..=107),
        Just(59u32),
    ];
    proptest::collection::vec(code, 0..12)
}

fn sgr_sequence(params: &[u32]) -> Vec<u8> {
    let joined: Vec<String> = params.iter().map(u32::to_string).collect();
    format!("\x1b[{}m", joined.join(";")).into_bytes()
}

// ── 1. Robustness ───────────────────────────────────────────────────────

proptest! {
    #[test]
    fn parser_never_panics(data in proptest::collection::vec(any::<u8>(), 0..1024)) {
        let mut parser = Parser::new();
        let _ = parser.parse_collect(&data);
    }

    #[test]
    fn parser_returns_to_ground(data in sequence_bytes()) {
        let mut parser = Parser::new();
        parser.parse_collect(&data);
        // CAN cancels anything in flight; a trailing ASCII byte then
        // flushes any partial UTF-8 character.
        let actions = parser.parse_collect(b"\x18Z");
        prop_assert_eq!(parser.state(), ParserState::Ground);
        prop_assert_eq!(actions.last(), Some(&Action::Print('Z')));
    }
}

// ── 2. Chunk invariance ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn chunking_does_not_change_actions(
        data in sequence_bytes(),
        cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..8),
    ) {
        let (whole, whole_parser) = parse_all(&[&data]);

        let mut points: Vec<usize> = cuts.iter().map(|c| c.index(data.len() + 1)).collect();
        points.sort_unstable();
        points.dedup();
        let mut chunks: Vec<&[u8]> = Vec::new();
        let mut start = 0;
        for point in points {
            chunks.push(&data[start..point]);
            start = point;
        }
        chunks.push(&data[start..]);

        let (split, split_parser) = parse_all(&chunks);
        prop_assert_eq!(whole, split);
        prop_assert_eq!(whole_parser.stats(), split_parser.stats());
    }

    #[test]
    fn byte_at_a_time_matches_whole(data in sequence_bytes()) {
        let (whole, _) = parse_all(&[&data]);
        let chunks: Vec<&[u8]> = data.chunks(1).collect();
        let (split, _) = parse_all(&chunks);
        prop_assert_eq!(whole, split);
    }
}

// ── 3. Colon / semicolon equivalence ────────────────────────────────────

proptest! {
    #[test]
    fn rgb_forms_agree(slot in prop_oneof![Just(38u32), Just(48), Just(58)], r: u8, g: u8, b: u8) {
        let semicolon = format!("\x1b[{};2;{};{};{}m", slot, r, g, b);
        let colon = format!("\x1b[{}:2:{}:{}:{}m", slot, r, g, b);
        let colon_space = format!("\x1b[{}:2::{}:{}:{}m", slot, r, g, b);

        let expected = rendition_after(semicolon.as_bytes());
        prop_assert!(!expected.is_default());
        prop_assert_eq!(rendition_after(colon.as_bytes()), expected);
        prop_assert_eq!(rendition_after(colon_space.as_bytes()), expected);
    }

    #[test]
    fn indexed_forms_agree(slot in prop_oneof![Just(38u32), Just(48), Just(58)], index: u8) {
        let semicolon = format!("\x1b[{};5;{}m", slot, index);
        let colon = format!("\x1b[{}:5:{}m", slot, index);
        prop_assert_eq!(rendition_after(semicolon.as_bytes()), rendition_after(colon.as_bytes()));
    }
}

// ── 4. Reset ────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn reset_restores_default(params in sgr_params(), r: u8, g: u8, b: u8) {
        let mut input = sgr_sequence(&params);
        input.extend(format!("\x1b[58;2;{};{};{}m", r, g, b).into_bytes());
        input.extend_from_slice(b"\x1b[0m");
        prop_assert!(rendition_after(&input).is_default());
    }

    #[test]
    fn to_sgr_replays_state(params in sgr_params()) {
        let state = rendition_after(&sgr_sequence(&params));
        prop_assert_eq!(rendition_after(state.to_sgr().as_bytes()), state);
    }
}

// ── 5. RPC id ranges ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn command_range_is_fire_and_forget(id in 1000u32..=1999) {
        prop_assert!(frame(id, RpcFrameType::FireAndForget).is_ok());
        let is_mismatch = matches!(
            frame(id, RpcFrameType::Query),
            Err(RpcError::CommandTypeMismatch { .. })
        );
        prop_assert!(is_mismatch);
    }

    #[test]
    fn query_range_is_query(id in 2000u32..=2999) {
        prop_assert!(frame(id, RpcFrameType::Query).is_ok());
        prop_assert!(frame(id, RpcFrameType::Response).is_ok());
        let is_mismatch = matches!(
            frame(id, RpcFrameType::FireAndForget),
            Err(RpcError::CommandTypeMismatch { .. })
        );
        prop_assert!(is_mismatch);
    }

    #[test]
    fn reserved_range_fits_nothing(id in 3000u32..=8999) {
        for frame_type in [
            RpcFrameType::FireAndForget,
            RpcFrameType::Query,
            RpcFrameType::Response,
            RpcFrameType::Error,
        ] {
            let is_mismatch = matches!(
                frame(id, frame_type),
                Err(RpcError::CommandTypeMismatch { .. })
            );
            prop_assert!(is_mismatch);
        }
    }

    #[test]
    fn out_of_range_ids_rejected(id in prop_oneof![0u32..1000, 10_000u32..100_000]) {
        prop_assert_eq!(
            frame(id, RpcFrameType::FireAndForget),
            Err(RpcError::InvalidCommandId(id))
        );
    }
}
