// Key switching of a random target tier with a random key, over NTT-friendly
// 60-bit primes.
//
// Run with `RUST_LOG=debug` to see the kernel configuration.

use itertools::Itertools;
use std::error::Error;
use switchkey::{
    KeySwitchKeyMaterial, ModSwitchFactorTable, ModulusTable, SwitchKeyKernel,
    SwitchKeyParametersBuilder,
};
use switchkey_math::zq::primes::generate_ntt_primes;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let coeff_count = 4096;
    let key_modulus_size = 4;
    let decomp_modulus_size = key_modulus_size - 1;

    let par = SwitchKeyParametersBuilder::new()
        .set_coeff_count(coeff_count)
        .set_decomp_modulus_size(decomp_modulus_size)
        .set_key_modulus_size(key_modulus_size)
        .set_key_component_count(2)
        .build()?;

    let Some(primes) = generate_ntt_primes(60, coeff_count, key_modulus_size) else {
        log::error!("Not enough 60-bit primes for polynomials of degree {coeff_count}");
        return Err("prime generation failed".into());
    };
    let moduli = ModulusTable::new(&primes)?;
    let factors = ModSwitchFactorTable::from_moduli(&moduli, decomp_modulus_size)?;

    let mut rng = rand::rng();
    let key_vectors = (0..decomp_modulus_size)
        .map(|_| {
            (0..par.key_component_count())
                .flat_map(|_| {
                    moduli
                        .iter()
                        .flat_map(|q| q.random_vec(coeff_count, &mut rng))
                        .collect_vec()
                })
                .collect_vec()
        })
        .collect_vec();
    let key = KeySwitchKeyMaterial::new(
        &key_vectors,
        par.key_component_count(),
        key_modulus_size,
        coeff_count,
    )?;
    let target_tier = (0..decomp_modulus_size)
        .flat_map(|j| moduli.modulus(j).random_vec(coeff_count, &mut rng))
        .collect_vec();

    let kernel = SwitchKeyKernel::new(&par, moduli)?;
    let mut buffer = vec![0u64; par.layout().buffer_len()];
    kernel.switch_key(&mut buffer, &target_tier, &key, &factors)?;

    let (switched, tail) = par.layout().split(&buffer)?;
    println!("moduli: {:?}", kernel.moduli().moduli());
    for (c, i) in (0..par.key_component_count()).cartesian_product(0..decomp_modulus_size) {
        let head = (0..4).map(|k| switched[[c, i, k]]).collect_vec();
        println!("component {c}, modulus {i}: {head:?}...");
    }
    assert_eq!(tail, &target_tier[..]);
    println!("target tier copied to the tail ({} residues)", tail.len());

    Ok(())
}
