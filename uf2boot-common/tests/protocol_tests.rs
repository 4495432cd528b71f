// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Unit tests for protocol types and constants.

use uf2boot_common::ingest::{TransferState, TransferStatus};
use uf2boot_common::protocol::{Command, Response, MAX_FRAME_SIZE, MAX_TRANSFER_SIZE};
use uf2boot_common::task::{ExclusiveMode, Status};
use uf2boot_common::SECTOR_SIZE;

fn cobs_round_trip_command(cmd: &Command) -> Command {
    let mut buf = [0u8; MAX_FRAME_SIZE];
    let len = postcard::to_slice_cobs(cmd, &mut buf).unwrap().len();
    assert_eq!(buf[len - 1], 0, "frame must end with the COBS delimiter");
    postcard::from_bytes_cobs(&mut buf[..len]).unwrap()
}

// --- Constants ---

#[test]
fn test_transfer_limits() {
    assert_eq!(MAX_TRANSFER_SIZE, 256);
    assert_eq!(SECTOR_SIZE, 512);
}

// --- Status codes ---

#[test]
fn test_status_codes_are_stable() {
    assert_eq!(Status::Ok.code(), 0);
    assert_eq!(Status::Disabled.code(), 1);
    assert_eq!(Status::InvalidTransferLength.code(), 3);
    assert_eq!(Status::InvalidAddress.code(), 4);
    assert_eq!(Status::BadAlignment.code(), 5);
    assert_eq!(Status::InterleavedWrite.code(), 6);
    assert_eq!(Status::Rebooting.code(), 7);
}

#[test]
fn test_status_from_code() {
    for code in 0..=7u8 {
        if let Some(status) = Status::from_code(code) {
            assert_eq!(status.code(), code);
        }
    }
    assert_eq!(Status::from_code(2), None);
    assert_eq!(Status::from_code(0xFF), None);
    assert!(Status::Ok.is_ok());
    assert!(!Status::Rebooting.is_ok());
}

#[test]
fn test_status_is_encoded_as_its_code() {
    for status in [
        Status::Ok,
        Status::Disabled,
        Status::InvalidTransferLength,
        Status::InvalidAddress,
        Status::BadAlignment,
        Status::InterleavedWrite,
        Status::Rebooting,
    ] {
        let mut buf = [0u8; 4];
        let encoded = postcard::to_slice(&status, &mut buf).unwrap();
        assert_eq!(encoded, &[status.code()][..], "{:?}", status);
        assert_eq!(postcard::from_bytes::<Status>(encoded).unwrap(), status);
    }
    // The gap in the code space is not a valid status.
    assert!(postcard::from_bytes::<Status>(&[2]).is_err());
}

#[test]
fn test_ack_carries_status_code_on_the_wire() {
    let resp = Response::Ack {
        token: 1,
        status: Status::Rebooting,
    };
    let mut buf = [0u8; 8];
    let encoded = postcard::to_slice(&resp, &mut buf).unwrap();
    // Variant index, varint token, status byte.
    assert_eq!(encoded, &[0, 1, 7][..]);
}

#[test]
fn test_exclusive_mode_from_u8() {
    assert_eq!(ExclusiveMode::from_u8(0), Some(ExclusiveMode::Shared));
    assert_eq!(ExclusiveMode::from_u8(2), Some(ExclusiveMode::ExclusiveAndEject));
    assert_eq!(ExclusiveMode::from_u8(3), None);
    assert!(!ExclusiveMode::Shared.is_exclusive());
}

// --- Command constructors ---

#[test]
fn test_write_size_limit() {
    assert!(Command::write(0, &[0; MAX_TRANSFER_SIZE]).is_some());
    assert!(Command::write(0, &[0; MAX_TRANSFER_SIZE + 1]).is_none());
}

#[test]
fn test_write_sector_size_limit() {
    assert!(Command::write_sector(0, &[0; SECTOR_SIZE]).is_some());
    assert!(Command::write_sector(0, &[0; SECTOR_SIZE + 1]).is_none());
}

#[test]
fn test_data_response_is_truncated() {
    let resp = Response::data(1, Status::Ok, &[0; 300]);
    match resp {
        Response::Data { data, .. } => assert_eq!(data.len(), MAX_TRANSFER_SIZE),
        other => panic!("unexpected response {:?}", other),
    }
}

// --- Framing ---

#[test]
fn test_simple_commands_survive_framing() {
    let commands = [
        Command::GetStatus,
        Command::ExclusiveAccess {
            mode: ExclusiveMode::Exclusive,
        },
        Command::Read {
            addr: 0x1000_0000,
            len: 256,
        },
        Command::FlashErase {
            addr: 0x1001_0000,
            len: 0x1_0000,
        },
        Command::Exec { addr: 0x2000_0001 },
        Command::Reboot {
            pc: 0,
            sp: 0,
            delay_ms: 500,
        },
    ];
    for cmd in commands {
        assert_eq!(cobs_round_trip_command(&cmd), cmd);
    }
}

#[test]
fn test_full_sector_fits_in_a_frame() {
    let data: Vec<u8> = (0..SECTOR_SIZE).map(|i| i as u8).collect();
    let cmd = Command::write_sector(7, &data).unwrap();
    assert_eq!(cobs_round_trip_command(&cmd), cmd);
}

#[test]
fn test_status_response_survives_framing() {
    let resp = Response::Status {
        transfer: TransferStatus {
            state: TransferState::Active,
            valid_block_count: 3,
            num_blocks: 10,
            is_ram: false,
        },
        exclusive: Some(ExclusiveMode::ExclusiveAndEject),
        rebooting: false,
    };
    let mut buf = [0u8; MAX_FRAME_SIZE];
    let len = postcard::to_slice_cobs(&resp, &mut buf).unwrap().len();
    let decoded: Response = postcard::from_bytes_cobs(&mut buf[..len]).unwrap();
    assert_eq!(decoded, resp);
    assert_eq!(decoded.completion(), None);
}

#[test]
fn test_ack_completion() {
    let resp = Response::Ack {
        token: 4,
        status: Status::InterleavedWrite,
    };
    assert_eq!(resp.completion(), Some((4, Status::InterleavedWrite)));
}
