//! Tests for the FCI solver

#[cfg(test)]
mod tests {
    use crate::davidson::{sorted_symmetric_eigen, DavidsonParams};
    use crate::determinant::{annihilate, create, double_excite, excite, StringSpace};
    use crate::{ActiveSpaceHamiltonian, DiagonalizationMethod, FciError, PotentialTerm, Spin, Tensor4, FCI};
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn hubbard_chain(sites: usize, t: f64, u: f64, periodic: bool) -> (DMatrix<f64>, Tensor4) {
        let mut h = DMatrix::zeros(sites, sites);
        for i in 0..sites - 1 {
            h[(i, i + 1)] = -t;
            h[(i + 1, i)] = -t;
        }
        if periodic && sites > 2 {
            h[(0, sites - 1)] = -t;
            h[(sites - 1, 0)] = -t;
        }
        (h, Tensor4::hubbard(sites, u))
    }

    fn solved(h: DMatrix<f64>, eri: Tensor4, na: usize, nb: usize, method: DiagonalizationMethod) -> FCI {
        let ham = ActiveSpaceHamiltonian::restricted(0.0, h, eri, na, nb).unwrap();
        let mut fci = FCI::new(ham, 1, method).unwrap();
        fci.solve().unwrap();
        fci
    }

    #[test]
    fn test_string_space_size() {
        let space = StringSpace::new(6, 3).unwrap();
        assert_eq!(space.len(), 20);
        for i in 0..space.len() {
            assert_eq!(space.string(i).count_ones(), 3);
            assert_eq!(space.position(space.string(i)), Some(i));
        }
        assert_eq!(StringSpace::new(4, 0).unwrap().len(), 1);
        assert!(matches!(
            StringSpace::new(2, 3),
            Err(FciError::TooManyElectrons { .. })
        ));
    }

    #[test]
    fn test_operator_signs() {
        // |0,2> : a_2 passes one occupied orbital
        let s = 0b101;
        assert_eq!(annihilate(s, 2), Some((0b001, -1.0)));
        assert_eq!(annihilate(s, 0), Some((0b100, 1.0)));
        assert_eq!(annihilate(s, 1), None);
        assert_eq!(create(s, 1), Some((0b111, -1.0)));
        assert_eq!(excite(s, 1, 2), Some((0b011, 1.0)));
        assert_eq!(excite(s, 2, 2), Some((s, 1.0)));
        // number operator pair
        assert_eq!(double_excite(s, 0, 0, 2, 2), Some((s, 1.0)));
        assert_eq!(double_excite(s, 0, 0, 0, 0), None);
    }

    #[test]
    fn test_two_site_hubbard_energy() {
        for &u in &[0.0, 1.0, 4.0, 8.0] {
            let (h, eri) = hubbard_chain(2, 1.0, u, false);
            let fci = solved(h, eri, 1, 1, DiagonalizationMethod::Exact);
            let exact = 0.5 * (u - (u * u + 16.0).sqrt());
            assert_relative_eq!(fci.energy(0).unwrap(), exact, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_rdm_traces_and_energy() {
        let (h, eri) = hubbard_chain(4, 1.0, 4.0, true);
        let fci = solved(h, eri, 2, 2, DiagonalizationMethod::Exact);
        let rdm = fci.rdm(0).unwrap();

        let (na, nb) = rdm.electrons();
        assert_relative_eq!(na, 2.0, epsilon = 1e-10);
        assert_relative_eq!(nb, 2.0, epsilon = 1e-10);

        // Σ_pr Γaa_pprr = N(N-1)
        let mut pairs = 0.0;
        let mut mixed = 0.0;
        for p in 0..4 {
            for r in 0..4 {
                pairs += rdm.two_aa[(p, p, r, r)];
                mixed += rdm.two_ab[(p, p, r, r)];
            }
        }
        assert_relative_eq!(pairs, 2.0, epsilon = 1e-10);
        assert_relative_eq!(mixed, 4.0, epsilon = 1e-10);

        let e = fci.energy(0).unwrap();
        assert_relative_eq!(fci.hamiltonian().expectation(&rdm), e, epsilon = 1e-9);

        let all: Vec<usize> = (0..4).collect();
        assert_relative_eq!(fci.impurity_energy(0, &all).unwrap(), e, epsilon = 1e-9);

        // Equivalent sites share the energy equally on the ring
        let site = fci.impurity_energy(0, &[1]).unwrap();
        assert_relative_eq!(site * 4.0, e, epsilon = 1e-9);
    }

    #[test]
    fn test_spin_resolved_accessors() {
        let (h, eri) = hubbard_chain(3, 1.0, 2.0, false);
        let fci = solved(h, eri, 2, 1, DiagonalizationMethod::Exact);
        let rdm = fci.rdm(0).unwrap();
        for p in 0..3 {
            for q in 0..3 {
                assert_relative_eq!(
                    rdm.total_one_body(p, q),
                    rdm.one_alpha[(p, q)] + rdm.one_beta[(p, q)],
                    epsilon = 1e-14
                );
                assert_relative_eq!(
                    rdm.two_body_element([Spin::Beta, Spin::Alpha], p, p, q, q),
                    rdm.two_ab[(q, q, p, p)],
                    epsilon = 1e-14
                );
            }
        }
    }

    #[test]
    fn test_davidson_matches_exact() {
        let (h, eri) = hubbard_chain(6, 1.0, 4.0, true);
        let exact = solved(h.clone(), eri.clone(), 3, 3, DiagonalizationMethod::Exact);
        let params = DavidsonParams {
            max_iterations: 300,
            convergence_threshold: 1e-8,
            max_subspace: 30,
        };
        let iterative = solved(h, eri, 3, 3, DiagonalizationMethod::Davidson(params));
        assert_relative_eq!(
            exact.energy(0).unwrap(),
            iterative.energy(0).unwrap(),
            epsilon = 1e-8
        );

        let ra = exact.rdm(0).unwrap();
        let rb = iterative.rdm(0).unwrap();
        assert_relative_eq!(ra.one_alpha[(0, 0)], rb.one_alpha[(0, 0)], epsilon = 1e-6);
    }

    #[test]
    fn test_diagonal_potential_fills_impurity() {
        let (h, eri) = hubbard_chain(4, 1.0, 2.0, false);
        let ham = ActiveSpaceHamiltonian::restricted(0.0, h, eri, 1, 1).unwrap();
        let mut base = FCI::new(ham, 1, DiagonalizationMethod::Exact).unwrap();

        let mut pulled = base.clone();
        for spin in [Spin::Alpha, Spin::Beta] {
            pulled
                .add_potential(PotentialTerm::OneBody {
                    p: 0,
                    q: 0,
                    spin,
                    value: -0.5,
                })
                .unwrap();
        }
        pulled.solve().unwrap();
        base.solve().unwrap();

        // the clone's potential never reaches the base
        assert!(base.potentials().is_empty());

        let before = base.rdm(0).unwrap().total_one_body(0, 0);
        let after = pulled.rdm(0).unwrap().total_one_body(0, 0);
        assert!(after > before, "occupation {} should exceed {}", after, before);
    }

    #[test]
    fn test_potential_is_hermitian_and_linear() {
        let (h, eri) = hubbard_chain(3, 1.0, 3.0, false);
        let ham = ActiveSpaceHamiltonian::restricted(0.0, h, eri, 1, 1).unwrap();
        let mut base = FCI::new(ham, 1, DiagonalizationMethod::Exact).unwrap();
        base.solve().unwrap();
        let e0 = base.energy(0).unwrap();
        let rdm = base.rdm(0).unwrap();

        // Hellmann-Feynman: dE/dv = <O>
        let dv = 1e-5;
        let mut probe = base.clone();
        probe
            .add_potential(PotentialTerm::OneBody {
                p: 0,
                q: 1,
                spin: Spin::Alpha,
                value: dv,
            })
            .unwrap();
        probe.solve().unwrap();
        let slope = (probe.energy(0).unwrap() - e0) / dv;
        let expected = 0.5 * (rdm.one_alpha[(0, 1)] + rdm.one_alpha[(1, 0)]);
        assert_relative_eq!(slope, expected, epsilon = 1e-4);

        let mut probe = base.clone();
        probe
            .add_potential(PotentialTerm::TwoBody {
                p: 0,
                q: 0,
                r: 1,
                s: 1,
                spins: [Spin::Alpha, Spin::Beta],
                value: dv,
            })
            .unwrap();
        probe.solve().unwrap();
        let slope = (probe.energy(0).unwrap() - e0) / dv;
        assert_relative_eq!(slope, rdm.two_ab[(0, 0, 1, 1)], epsilon = 1e-4);
    }

    #[test]
    fn test_out_of_range_requests() {
        let (h, eri) = hubbard_chain(2, 1.0, 1.0, false);
        let ham = ActiveSpaceHamiltonian::restricted(0.0, h, eri, 1, 1).unwrap();
        let mut fci = FCI::new(ham, 1, DiagonalizationMethod::Exact).unwrap();
        assert!(matches!(fci.rdm(0), Err(FciError::NotSolved)));
        assert!(matches!(
            fci.add_potential(PotentialTerm::OneBody {
                p: 2,
                q: 0,
                spin: Spin::Alpha,
                value: 1.0
            }),
            Err(FciError::OrbitalOutOfRange { .. })
        ));
        fci.solve().unwrap();
        assert!(matches!(fci.energy(1), Err(FciError::StateOutOfRange { .. })));
    }

    #[test]
    fn test_transform_preserves_energy() {
        let mut rng = StdRng::seed_from_u64(7);
        let (h, eri) = hubbard_chain(4, 1.0, 2.5, false);
        let reference = solved(h.clone(), eri.clone(), 2, 2, DiagonalizationMethod::Exact);

        let random = DMatrix::from_fn(4, 4, |_, _| rng.gen_range(-1.0..1.0));
        let (_, q) = sorted_symmetric_eigen(&random + random.transpose());
        let h_rot = q.transpose() * &h * &q;
        let eri_rot = eri.transform(&q).unwrap();
        let rotated = solved(h_rot, eri_rot, 2, 2, DiagonalizationMethod::Exact);

        assert_relative_eq!(
            reference.energy(0).unwrap(),
            rotated.energy(0).unwrap(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_spin_dependent_rotation_preserves_energy() {
        let mut rng = StdRng::seed_from_u64(11);
        let (h, eri) = hubbard_chain(4, 1.0, 3.0, true);
        let reference = solved(h.clone(), eri.clone(), 2, 1, DiagonalizationMethod::Exact);

        let mut orthogonal = || {
            let random = DMatrix::from_fn(4, 4, |_, _| rng.gen_range(-1.0..1.0));
            sorted_symmetric_eigen(&random + random.transpose()).1
        };
        let qa = orthogonal();
        let qb = orthogonal();
        let ham = ActiveSpaceHamiltonian::unrestricted(
            0.0,
            qa.transpose() * &h * &qa,
            qb.transpose() * &h * &qb,
            eri.transform(&qa).unwrap(),
            eri.transform_pairs(&qa, &qb).unwrap(),
            eri.transform(&qb).unwrap(),
            2,
            1,
        )
        .unwrap();
        let mut rotated = FCI::new(ham, 1, DiagonalizationMethod::Exact).unwrap();
        rotated.solve().unwrap();

        assert_relative_eq!(
            reference.energy(0).unwrap(),
            rotated.energy(0).unwrap(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_unrestricted_dimension_checks() {
        let (h, eri) = hubbard_chain(3, 1.0, 1.0, false);
        let small = DMatrix::zeros(2, 2);
        assert!(matches!(
            ActiveSpaceHamiltonian::unrestricted(0.0, h.clone(), small, eri.clone(), eri.clone(), eri.clone(), 1, 1),
            Err(FciError::DimensionMismatch(_))
        ));
        let narrow = DMatrix::zeros(3, 2);
        assert!(matches!(
            eri.transform_pairs(&DMatrix::identity(3, 3), &narrow),
            Err(FciError::DimensionMismatch(_))
        ));
    }
}
