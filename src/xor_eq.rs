// Bulk block XOR, the hottest primitive in the codec: every row operation on
// block values lands in one of these three. u64 lanes with a byte tail.

fn lanes(block: &[u8]) -> (&[u8], &[u8]) {
    let split = block.len() & !7;
    block.split_at(split)
}

fn load(lane: &[u8]) -> u64 {
    u64::from_ne_bytes(lane.try_into().unwrap())
}

/// dst ^= a
pub fn xor_eq(dst: &mut [u8], a: &[u8]) {
    assert_eq!(dst.len(), a.len());

    let split = dst.len() & !7;
    let (dst_body, dst_tail) = dst.split_at_mut(split);
    let (a_body, a_tail) = lanes(a);

    for (d, s) in dst_body.chunks_exact_mut(8).zip(a_body.chunks_exact(8)) {
        let x = load(d) ^ load(s);
        d.copy_from_slice(&x.to_ne_bytes());
    }
    for (d, s) in dst_tail.iter_mut().zip(a_tail) {
        *d ^= *s;
    }
}

/// dst = a ^ b
pub fn xor_eq_set(dst: &mut [u8], a: &[u8], b: &[u8]) {
    assert_eq!(dst.len(), a.len());
    assert_eq!(dst.len(), b.len());

    let split = dst.len() & !7;
    let (dst_body, dst_tail) = dst.split_at_mut(split);
    let (a_body, a_tail) = lanes(a);
    let (b_body, b_tail) = lanes(b);

    for ((d, s0), s1) in dst_body
        .chunks_exact_mut(8)
        .zip(a_body.chunks_exact(8))
        .zip(b_body.chunks_exact(8))
    {
        let x = load(s0) ^ load(s1);
        d.copy_from_slice(&x.to_ne_bytes());
    }
    for ((d, s0), s1) in dst_tail.iter_mut().zip(a_tail).zip(b_tail) {
        *d = *s0 ^ *s1;
    }
}

/// dst ^= a ^ b
pub fn xor_eq_add(dst: &mut [u8], a: &[u8], b: &[u8]) {
    assert_eq!(dst.len(), a.len());
    assert_eq!(dst.len(), b.len());

    let split = dst.len() & !7;
    let (dst_body, dst_tail) = dst.split_at_mut(split);
    let (a_body, a_tail) = lanes(a);
    let (b_body, b_tail) = lanes(b);

    for ((d, s0), s1) in dst_body
        .chunks_exact_mut(8)
        .zip(a_body.chunks_exact(8))
        .zip(b_body.chunks_exact(8))
    {
        let x = load(d) ^ load(s0) ^ load(s1);
        d.copy_from_slice(&x.to_ne_bytes());
    }
    for ((d, s0), s1) in dst_tail.iter_mut().zip(a_tail).zip(b_tail) {
        *d ^= *s0 ^ *s1;
    }
}
