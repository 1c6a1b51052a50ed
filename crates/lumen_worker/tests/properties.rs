//! Property tests over the dispatcher and its wire format

mod common;

use std::collections::BTreeSet;

use common::{handle_bytes, Host};
use lumen_core::{DataType, Handle, NULL_HANDLE};
use lumen_engine::{InterleavedTiledLoadBalancer, TileGrid};
use lumen_worker::{ArgStream, ArgWriter, DispatchError, Verb};
use proptest::prelude::*;

fn numeric_type() -> impl Strategy<Value = DataType> {
    prop::sample::select(vec![
        DataType::UChar,
        DataType::UChar4,
        DataType::Int,
        DataType::Int3,
        DataType::UInt2,
        DataType::Long2,
        DataType::Float,
        DataType::Float3,
        DataType::Float3A,
        DataType::Float4,
        DataType::Double,
    ])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn bound_handles_resolve_to_their_own_object(indices in prop::collection::btree_set(1u64..100_000, 1..24)) {
        let mut host = Host::new();
        let handles: Vec<Handle> = indices.iter().map(|&i| Handle::new(i, 3)).collect();
        for &h in &handles {
            host.send(Verb::NewModel, ArgWriter::new().put_handle(h), &[]);
        }
        prop_assert_eq!(host.worker.objects().len(), handles.len());

        for (i, &a) in handles.iter().enumerate() {
            for &b in &handles[i + 1..] {
                prop_assert!(!host.object(a).ptr_eq(&host.object(b)));
            }
        }

        // Rebinding any live handle is refused and leaves the table alone
        let again = handles[handles.len() / 2];
        let before = host.object(again);
        prop_assert!(host.try_send(Verb::NewModel, ArgWriter::new().put_handle(again), &[]).is_err());
        prop_assert!(host.object(again).ptr_eq(&before));
    }

    #[test]
    fn empty_data_has_element_width_times_count(ty in numeric_type(), count in 0i32..256) {
        let mut host = Host::new();
        let d = host.handle();
        host.send(
            Verb::CreateNewEmptyData,
            ArgWriter::new().put_handle(d).put(count).put(ty.raw() as i32).put(0i32),
            &[],
        );
        let data = host.object(d);
        let state = data.read();
        let data = state.data().unwrap();
        prop_assert_eq!(data.byte_len(), ty.size() * count as usize);
        prop_assert_eq!(data.to_vec().len(), data.byte_len());
    }

    #[test]
    fn arg_stream_reads_back_a_packed_schema(
        bits in any::<u64>(),
        begin in any::<i64>(),
        count in any::<i32>(),
        name in "[a-zA-Z_.]{0,24}",
        color in any::<[u8; 4]>(),
    ) {
        let handle = Handle::from_bits(bits);
        let mut writer = ArgWriter::new();
        writer.put_handle(handle).put(begin).put(count).put_string(&name).put(color);
        let bytes = writer.finish();
        prop_assert_eq!(bytes.len(), 8 + 8 + 4 + 4 + name.len() + 4);

        let mut stream = ArgStream::new(&bytes);
        prop_assert_eq!(stream.get_handle().unwrap(), handle);
        prop_assert_eq!(stream.get::<i64>().unwrap(), begin);
        prop_assert_eq!(stream.get::<i32>().unwrap(), count);
        prop_assert_eq!(stream.get_string().unwrap(), name);
        prop_assert_eq!(stream.get::<[u8; 4]>().unwrap(), color);
        prop_assert!(stream.is_empty());
    }

    #[test]
    fn truncated_arguments_never_bind(cut in 0usize..20) {
        // handle + count + type + flags is 20 bytes
        let mut host = Host::new();
        let d = host.handle();
        let mut writer = ArgWriter::new();
        writer.put_handle(d).put(4i32).put(DataType::Float.raw() as i32).put(0i32);
        let mut bytes = writer.finish();
        bytes.truncate(cut);

        let mut frame = lumen_worker::CommandFrame::new(Verb::CreateNewEmptyData, bytes);
        let err = host.worker.dispatch(&mut frame).unwrap_err();
        prop_assert!(matches!(err, DispatchError::Truncated { .. }), "unexpected error {}", err);
        prop_assert!(host.worker.objects().is_empty());
    }

    #[test]
    fn object_arrays_resolve_exactly_once(
        picks in prop::collection::vec(prop::option::of(0usize..3), 1..12),
        repeats in 1usize..4,
    ) {
        let mut host = Host::new();
        let pool: Vec<Handle> = (0..3).map(|_| host.new_named(Verb::NewGeometry, "triangles")).collect();
        let objects: Vec<_> = pool.iter().map(|&h| host.object(h)).collect();
        let base: Vec<u32> = objects.iter().map(|o| o.ref_count()).collect();

        let handles: Vec<Handle> = picks.iter().map(|p| p.map_or(NULL_HANDLE, |i| pool[i])).collect();
        let (d, _) = host.new_data(handles.len() as i32, DataType::Geometry.raw(), handle_bytes(&handles));
        for _ in 0..repeats {
            host.send(
                Verb::UploadDataDone,
                ArgWriter::new()
                    .put_handle(d)
                    .put(handles.len() as i32)
                    .put(DataType::Geometry.raw() as i32)
                    .put(0i32),
                &[],
            );
        }

        for (i, object) in objects.iter().enumerate() {
            let uses = picks.iter().filter(|p| **p == Some(i)).count() as u32;
            prop_assert_eq!(object.ref_count(), base[i] + uses);
        }

        // Releasing the array returns every reference it took
        host.send(Verb::Release, ArgWriter::new().put_handle(d), &[]);
        for (i, object) in objects.iter().enumerate() {
            prop_assert_eq!(object.ref_count(), base[i]);
        }
    }

    #[test]
    fn commit_is_idempotent(pos in any::<[i16; 3]>(), times in 1usize..4) {
        let mut host = Host::new();
        let c = host.new_named(Verb::NewCamera, "orthographic");
        let pos = pos.map(f32::from);
        host.set_value(c, "pos", DataType::Float3.raw(), ArgWriter::new().put(pos));

        host.commit(c);
        let first = host.object(c).read().camera().unwrap().frame();
        for _ in 0..times {
            host.commit(c);
        }
        let camera = host.object(c);
        let state = camera.read();
        prop_assert_eq!(state.camera().unwrap().frame(), first);
        prop_assert_eq!(state.camera().unwrap().position().to_array(), pos);
    }

    #[test]
    fn remove_geometry_drops_only_the_first_match(
        adds in prop::collection::vec(0usize..3, 0..10),
        target in 0usize..3,
    ) {
        let mut host = Host::new();
        let model = host.new_model();
        let pool: Vec<Handle> = (0..3).map(|_| host.new_named(Verb::NewGeometry, "spheres")).collect();
        for &i in &adds {
            host.send(Verb::AddGeometry, ArgWriter::new().put_handle(model).put_handle(pool[i]), &[]);
        }
        host.send(Verb::RemoveGeometry, ArgWriter::new().put_handle(model).put_handle(pool[target]), &[]);

        let mut expected = adds.clone();
        if let Some(first) = expected.iter().position(|&i| i == target) {
            expected.remove(first);
        }

        let model = host.object(model);
        let state = model.read();
        let list = state.model().unwrap().geometry();
        prop_assert_eq!(list.len(), expected.len());
        for (object, &i) in list.iter().zip(&expected) {
            prop_assert!(object.ptr_eq(&host.object(pool[i])));
        }
    }
}

proptest! {
    #[test]
    fn devices_partition_the_tile_grid(
        width in 1u32..400,
        height in 1u32..400,
        tile_size in 1u32..80,
        devices in 1usize..6,
    ) {
        let grid = TileGrid::new(width, height, tile_size);
        let mut seen = BTreeSet::new();
        let mut pixels = 0usize;

        for id in 0..devices {
            let balancer = InterleavedTiledLoadBalancer::new(id, devices).unwrap();
            for tile in balancer.tiles(&grid) {
                prop_assert!(balancer.owns(tile.index));
                prop_assert!(seen.insert(tile.index), "tile {} rendered twice", tile.index);
                prop_assert!(tile.x1 <= width && tile.y1 <= height);
                pixels += tile.pixel_count();
            }
        }

        prop_assert_eq!(seen.len(), grid.count());
        prop_assert_eq!(pixels, width as usize * height as usize);
    }
}
