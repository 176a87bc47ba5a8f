////////////////////////////////////////////////////////////////////////////////
// This Source Code Form is subject to the terms of the Mozilla Public         /
// License, v. 2.0. If a copy of the MPL was not distributed with this         /
// file, You can obtain one at https://mozilla.org/MPL/2.0/.                   /
//                                                                             /
////////////////////////////////////////////////////////////////////////////////

use criterion::measurement::WallTime;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use westwood::lcw::command::{Command, Control};
use westwood::lcw::{decode, DecodeOptions};

const CONST_BENCH_LENGTH: usize = 8096;

fn repeating_control_data(command: Command, repeats: usize) -> Vec<u8> {
    let mut controls = vec![Control::new_literal_block(&[0; 4])];
    controls.append(&mut vec![Control::new(command, vec![]); repeats]);
    controls.push(Control::new_stop());

    let mut out = vec![];
    for control in controls {
        control.write(&mut out).unwrap();
    }
    out
}

fn repeating_control_bench(c: &mut Criterion<WallTime>, name: &str, command: Command) {
    let mut group = c.benchmark_group(name.to_string());
    let length = 4 + command.output_length() * CONST_BENCH_LENGTH;

    group.throughput(Throughput::Bytes(length as u64));

    let input = repeating_control_data(command, CONST_BENCH_LENGTH);

    group.bench_with_input("decode", &input, |b, i| {
        b.iter(|| decode(black_box(i), length, DecodeOptions::default()))
    });

    group.finish();
}

fn short_control_bench(c: &mut Criterion<WallTime>) {
    repeating_control_bench(
        c,
        "Repeating short control copy 1 byte",
        Command::Short {
            distance: 1,
            length: 3,
        },
    );
}

fn medium_control_bench(c: &mut Criterion<WallTime>) {
    repeating_control_bench(
        c,
        "Repeating medium control copy from start",
        Command::Medium {
            offset: 0,
            length: 4,
        },
    );
}

fn fill_control_bench(c: &mut Criterion<WallTime>) {
    repeating_control_bench(
        c,
        "Repeating fill control",
        Command::Fill {
            length: 64,
            value: 0xAB,
        },
    );
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = short_control_bench, medium_control_bench, fill_control_bench
);
criterion_main!(benches);
